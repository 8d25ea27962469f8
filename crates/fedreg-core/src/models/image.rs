//! Image domain model.

use serde::{Deserialize, Serialize};

use crate::graph::{Label, Relation};
use crate::models::item::{default_shared, CreateItem, ServiceItem};
use crate::models::node::{Node, NodeAttrs};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
    pub uuid: String,
    /// `Linux` or `Windows`.
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub os_distro: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub kernel_id: Option<String>,
    #[serde(default)]
    pub cuda_support: bool,
    #[serde(default)]
    pub gpu_driver: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_shared")]
    pub is_shared: bool,
}

impl Default for ImageAttrs {
    fn default() -> Self {
        Self {
            description: String::new(),
            name: String::new(),
            uuid: String::new(),
            os_type: None,
            os_distro: None,
            os_version: None,
            architecture: None,
            kernel_id: None,
            cuda_support: false,
            gpu_driver: false,
            tags: Vec::new(),
            is_shared: true,
        }
    }
}

impl NodeAttrs for ImageAttrs {
    const LABEL: Label = Label::Image;
}

impl ServiceItem for ImageAttrs {
    const SERVICE_RELATION: Relation = Relation::ServiceImage;
    const PROJECT_RELATION: Relation = Relation::ProjectImage;

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn is_shared(&self) -> bool {
        self.is_shared
    }
}

pub type Image = Node<ImageAttrs>;
pub type CreateImage = CreateItem<ImageAttrs>;
