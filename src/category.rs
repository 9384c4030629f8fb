//! Asset categories handled by the build.
//!
//! Every category owns one pipeline, one entry in the path table and one
//! destination directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical asset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    /// HTML pages, copied verbatim
    Html,
    /// Sass stylesheets compiled to prefixed, minified CSS
    Style,
    /// Scripts bundled through include directives and minified
    Script,
    /// Font files, copied verbatim
    Font,
    /// Images, recompressed where possible
    Image,
}

impl AssetCategory {
    /// All categories in production build order.
    pub const ALL: [AssetCategory; 5] = [
        AssetCategory::Html,
        AssetCategory::Style,
        AssetCategory::Script,
        AssetCategory::Font,
        AssetCategory::Image,
    ];

    /// Task name used for the build step and on the command line.
    pub fn task_name(self) -> &'static str {
        match self {
            AssetCategory::Html => "html",
            AssetCategory::Style => "scss",
            AssetCategory::Script => "js",
            AssetCategory::Font => "fonts",
            AssetCategory::Image => "img",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            AssetCategory::Html => "html",
            AssetCategory::Style => "style",
            AssetCategory::Script => "script",
            AssetCategory::Font => "font",
            AssetCategory::Image => "image",
        }
    }

    /// Whether a single file failure is logged instead of failing the pipeline.
    ///
    /// Only stylesheets are lenient; every other category fails on the first
    /// transform error.
    pub fn is_lenient(self) -> bool {
        matches!(self, AssetCategory::Style)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Error for unknown category names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset category '{0}' (expected html, style, script, font or image)")]
pub struct UnknownCategory(pub String);

impl FromStr for AssetCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(AssetCategory::Html),
            "style" | "scss" | "css" => Ok(AssetCategory::Style),
            "script" | "js" | "jsprod" => Ok(AssetCategory::Script),
            "font" | "fonts" => Ok(AssetCategory::Font),
            "image" | "images" | "img" => Ok(AssetCategory::Image),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}
