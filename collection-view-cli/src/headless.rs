//! Host, engine and template runtime that print instead of render

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use collection_view_lib::engine::DataSet;
use collection_view_lib::engine::Transition;
use collection_view_lib::engine::VirtualizationEngine;
use collection_view_lib::error::ConfigError;
use collection_view_lib::error::PublishError;
use collection_view_lib::host::Fade;
use collection_view_lib::host::HostSurface;
use collection_view_lib::host::TemplateHandle;
use collection_view_lib::host::TemplateRuntime;
use collection_view_lib::host::names;
use collection_view_lib::model::Value;
use collection_view_lib::template::TemplateDefinition;
use log::debug;
use log::info;

// =============================================================================
// Host
// =============================================================================

/// Prints every property write, event and selection publication.
#[derive(Debug, Default)]
pub struct PrintingHost {
    properties: Mutex<HashMap<String, Value>>,
    quiet_data: bool,
}

impl PrintingHost {
    pub fn new(quiet_data: bool) -> Self {
        Self {
            properties: Mutex::new(HashMap::new()),
            quiet_data,
        }
    }
}

impl HostSurface for PrintingHost {
    fn property(&self, name: &str) -> Option<Value> {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PublishError> {
        if !(self.quiet_data && name == names::DATA) {
            println!("  property {} = {}", name, value);
        }
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
        Ok(())
    }

    fn fire_event(&self, name: &str) {
        println!("  event {}", name);
    }

    fn publish_selection(&self, property: &str, indices: &[usize]) -> Result<(), PublishError> {
        println!("  selection {} = {:?}", property, indices);
        Ok(())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Applies every data change immediately and logs the section layout.
#[derive(Debug, Default)]
pub struct HeadlessEngine;

fn describe(data: &dyn DataSet) -> String {
    let counts: Vec<String> = (0..data.number_of_sections())
        .map(|s| data.number_of_rows(s).to_string())
        .collect();
    format!("[{}]", counts.join(", "))
}

#[async_trait]
impl VirtualizationEngine for HeadlessEngine {
    fn install(&self, data: &dyn DataSet) {
        info!("Installed data set with sections {}", describe(data));
    }

    async fn transition(&self, data: &dyn DataSet, transition: Transition) {
        data.use_old_data(true);
        let before = describe(data);
        data.use_old_data(false);
        info!(
            "Transition {} -> {} items: sections {} -> {}",
            transition.previous_count,
            transition.count,
            before,
            describe(data)
        );
    }
}

// =============================================================================
// Template runtime
// =============================================================================

/// Creates handles that log what a real template would receive.
#[derive(Debug, Default)]
pub struct PrintingRuntime;

impl TemplateRuntime for PrintingRuntime {
    fn instantiate(&self, definition: &TemplateDefinition) -> Result<Box<dyn TemplateHandle>, ConfigError> {
        debug!("Instantiating template '{}'", definition.name);
        Ok(Box::new(PrintingHandle {
            template: definition.name.clone(),
        }))
    }
}

struct PrintingHandle {
    template: String,
}

impl TemplateHandle for PrintingHandle {
    fn set_parameter(&mut self, name: &str, value: &Value) {
        println!("    {}.{} = {}", self.template, name, value);
    }

    fn fire_loaded(&mut self) {
        println!("    {} loaded", self.template);
    }

    fn begin_fade(&mut self, fade: Fade) {
        debug!("{} fading {:?}", self.template, fade);
    }

    fn destroy(&mut self) {
        debug!("{} destroyed", self.template);
    }
}
