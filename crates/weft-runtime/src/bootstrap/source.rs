//! Where root plans come from.

use crate::factory::InstantiationPlan;
use std::path::PathBuf;

/// Supplies the root plan to [`Engine::bootstrap`](crate::Engine::bootstrap).
///
/// Parsing is the source's concern; the engine only sees the plan. Errors
/// are plain messages and surface as `InvalidPlan`.
pub trait PlanSource: Send + Sync {
    /// Produces the plan.
    ///
    /// # Errors
    ///
    /// A message saying why no plan could be produced.
    fn load(&self) -> Result<InstantiationPlan, String>;

    /// Short description for logs.
    fn describe(&self) -> String {
        "plan".to_string()
    }
}

impl PlanSource for InstantiationPlan {
    fn load(&self) -> Result<InstantiationPlan, String> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("plan '{}'", self.key)
    }
}

#[derive(Debug, Clone)]
enum Origin {
    Inline(String),
    File(PathBuf),
}

impl Origin {
    fn read(&self) -> Result<String, String> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display())),
        }
    }

    fn describe(&self, format: &str) -> String {
        match self {
            Self::Inline(_) => format!("inline {format}"),
            Self::File(path) => format!("{format} file {}", path.display()),
        }
    }
}

/// A plan written in TOML.
///
/// # Example
///
/// ```
/// use weft_runtime::{PlanSource, TomlPlanSource};
///
/// let source = TomlPlanSource::inline(r#"key = "app""#);
/// assert_eq!(source.load().unwrap().key, "app");
/// ```
#[derive(Debug, Clone)]
pub struct TomlPlanSource {
    origin: Origin,
}

impl TomlPlanSource {
    /// Plan text held in memory.
    #[must_use]
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Inline(text.into()),
        }
    }

    /// Plan read from `path` on every load.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }
}

impl PlanSource for TomlPlanSource {
    fn load(&self) -> Result<InstantiationPlan, String> {
        let text = self.origin.read()?;
        InstantiationPlan::from_toml(&text)
            .map_err(|e| format!("{}: {e}", self.origin.describe("toml")))
    }

    fn describe(&self) -> String {
        self.origin.describe("toml")
    }
}

/// A plan written in JSON.
#[derive(Debug, Clone)]
pub struct JsonPlanSource {
    origin: Origin,
}

impl JsonPlanSource {
    /// Plan text held in memory.
    #[must_use]
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Inline(text.into()),
        }
    }

    /// Plan read from `path` on every load.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }
}

impl PlanSource for JsonPlanSource {
    fn load(&self) -> Result<InstantiationPlan, String> {
        let text = self.origin.read()?;
        InstantiationPlan::from_json(&text)
            .map_err(|e| format!("{}: {e}", self.origin.describe("json")))
    }

    fn describe(&self) -> String {
        self.origin.describe("json")
    }
}
