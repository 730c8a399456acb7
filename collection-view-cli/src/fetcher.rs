//! Template definitions read from a local directory

use std::io;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use collection_view_lib::error::FetchError;
use collection_view_lib::template::TemplateDefinition;
use collection_view_lib::template::TemplateFetcher;
use log::debug;

/// Serves `<dir>/<name>.json` as the definition of template `name`.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }
}

fn decode(name: &str, path: &Path, read: io::Result<String>) -> Result<TemplateDefinition, FetchError> {
    let body = match read {
        Ok(body) => body,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(FetchError::NotFound(name.to_string())),
        Err(e) => return Err(FetchError::network(name, format!("{}: {}", path.display(), e))),
    };
    let mut definition: TemplateDefinition =
        serde_json::from_str(&body).map_err(|e| FetchError::parse(name, e))?;
    if definition.name.is_empty() {
        definition.name = name.to_string();
    }
    Ok(definition)
}

#[async_trait]
impl TemplateFetcher for DirectoryFetcher {
    async fn fetch(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        let path = self.path_for(name);
        debug!("Reading template '{}' from {}", name, path.display());
        decode(name, &path, tokio::fs::read_to_string(&path).await)
    }

    fn fetch_blocking(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        let path = self.path_for(name);
        decode(name, &path, std::fs::read_to_string(&path))
    }
}
