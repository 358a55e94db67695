//! State tree as reported by `terraform show -json`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateTree {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    pub values: Option<StateValues>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateValues {
    #[serde(default)]
    pub root_module: StateModule,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateModule {
    /// Absent for the root module
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub resources: Vec<StateResource>,
    #[serde(default)]
    pub child_modules: Vec<StateModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResource {
    pub address: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl StateResource {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mode: None,
            resource_type: None,
            name: None,
        }
    }
}

impl StateTree {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn root(&self) -> Option<&StateModule> {
        self.values.as_ref().map(|v| &v.root_module)
    }

    /// True when neither the root nor any child module holds a resource
    pub fn is_empty(&self) -> bool {
        self.root().is_none_or(StateModule::is_empty)
    }

    /// Every resource address, depth-first from the root module
    pub fn addresses(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(root) = self.root() {
            root.collect_addresses(&mut out);
        }
        out
    }
}

impl StateModule {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.child_modules.iter().all(StateModule::is_empty)
    }

    fn collect_addresses(&self, out: &mut Vec<String>) {
        out.extend(self.resources.iter().map(|r| r.address.clone()));
        for child in &self.child_modules {
            child.collect_addresses(out);
        }
    }
}
