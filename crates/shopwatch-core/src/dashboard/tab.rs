use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Dashboard,
    Products,
    History,
    Infra,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Products => "Products / Order",
            Tab::History => "Order History",
            Tab::Infra => "Infrastructure",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Products => "products",
            Tab::History => "history",
            Tab::Infra => "infra",
        }
    }

    pub fn all() -> &'static [Tab] {
        &[Tab::Dashboard, Tab::Products, Tab::History, Tab::Infra]
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tab::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tab: {}", s))
    }
}
