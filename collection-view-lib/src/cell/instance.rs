//! Live template instances

use std::collections::HashMap;

use log::debug;

use crate::error::ConfigError;
use crate::host::Fade;
use crate::host::TemplateHandle;
use crate::host::TemplateRuntime;
use crate::model::Value;
use crate::template::TemplateDefinition;

/// A template instantiated for one cell.
///
/// Tracks the last value of every parameter so unchanged values are not
/// pushed again. Once destroyed, parameter writes are ignored. Dropping an
/// instance destroys it.
pub struct TemplateInstance {
    template: String,
    handle: Box<dyn TemplateHandle>,
    parameters: HashMap<String, Value>,
    destroyed: bool,
}

impl TemplateInstance {
    pub fn build(runtime: &dyn TemplateRuntime, definition: &TemplateDefinition) -> Result<Self, ConfigError> {
        let handle = runtime.instantiate(definition)?;
        Ok(Self {
            template: definition.name.clone(),
            handle,
            parameters: HashMap::new(),
            destroyed: false,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Pushes a value into the template. Returns true if it was sent.
    pub fn set_parameter(&mut self, name: &str, value: Value) -> bool {
        if self.destroyed || self.parameters.get(name) == Some(&value) {
            return false;
        }
        self.handle.set_parameter(name, &value);
        self.parameters.insert(name.to_string(), value);
        true
    }

    /// Records a value the template set on itself.
    pub(crate) fn record_parameter(&mut self, name: &str, value: Value) {
        if !self.destroyed {
            self.parameters.insert(name.to_string(), value);
        }
    }

    pub(crate) fn fire_loaded(&mut self) {
        if !self.destroyed {
            self.handle.fire_loaded();
        }
    }

    pub(crate) fn layout_changed(&mut self) {
        if !self.destroyed {
            self.handle.layout_changed();
        }
    }

    pub(crate) fn begin_fade(&mut self, fade: Fade) {
        if !self.destroyed {
            self.handle.begin_fade(fade);
        }
    }

    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        debug!("Destroying instance of template '{}'", self.template);
        self.destroyed = true;
        self.handle.destroy();
    }
}

impl Drop for TemplateInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for TemplateInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateInstance")
            .field("template", &self.template)
            .field("parameters", &self.parameters)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
