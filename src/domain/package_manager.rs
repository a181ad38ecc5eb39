//! Package manager identifiers for supported ecosystems

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Separator runs collapsed by PEP 503 name normalisation
static PYTHON_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("valid regex"));

/// Package managers a job can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    /// Ruby (Gemfile)
    Bundler,
    /// Node.js (package.json)
    NpmAndYarn,
    /// Python (requirements.txt, pyproject.toml)
    Pip,
    /// Python (uv.lock)
    Uv,
    /// Rust (Cargo.toml)
    Cargo,
    /// Go (go.mod)
    GoModules,
    /// PHP (composer.json)
    Composer,
    /// Java (pom.xml)
    Maven,
    /// Java/Kotlin (build.gradle)
    Gradle,
    /// .NET (*.csproj)
    Nuget,
    /// Dockerfile base images
    Docker,
    /// GitHub Actions workflows
    GithubActions,
    /// Elixir (mix.exs)
    Hex,
    /// Dart (pubspec.yaml)
    Pub,
    /// Terraform modules and providers
    Terraform,
    /// Swift Package Manager
    Swift,
    /// Bazel modules
    Bazel,
    /// Conda environments
    Conda,
    /// vcpkg manifests
    Vcpkg,
    /// Git submodules
    Submodules,
    /// Elm packages
    Elm,
}

impl PackageManager {
    /// Returns the identifier used in job definitions
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Bundler => "bundler",
            PackageManager::NpmAndYarn => "npm_and_yarn",
            PackageManager::Pip => "pip",
            PackageManager::Uv => "uv",
            PackageManager::Cargo => "cargo",
            PackageManager::GoModules => "go_modules",
            PackageManager::Composer => "composer",
            PackageManager::Maven => "maven",
            PackageManager::Gradle => "gradle",
            PackageManager::Nuget => "nuget",
            PackageManager::Docker => "docker",
            PackageManager::GithubActions => "github_actions",
            PackageManager::Hex => "hex",
            PackageManager::Pub => "pub",
            PackageManager::Terraform => "terraform",
            PackageManager::Swift => "swift",
            PackageManager::Bazel => "bazel",
            PackageManager::Conda => "conda",
            PackageManager::Vcpkg => "vcpkg",
            PackageManager::Submodules => "submodules",
            PackageManager::Elm => "elm",
        }
    }

    /// Returns the ecosystem name as written in user-facing configuration
    pub fn ecosystem(&self) -> &'static str {
        match self {
            PackageManager::Bundler => "rubygems",
            PackageManager::NpmAndYarn => "npm",
            PackageManager::GoModules => "gomod",
            PackageManager::GithubActions => "github-actions",
            PackageManager::Hex => "mix",
            PackageManager::Submodules => "gitsubmodule",
            other => other.as_str(),
        }
    }

    /// Returns all supported package managers
    pub fn all() -> &'static [PackageManager] {
        &[
            PackageManager::Bundler,
            PackageManager::NpmAndYarn,
            PackageManager::Pip,
            PackageManager::Uv,
            PackageManager::Cargo,
            PackageManager::GoModules,
            PackageManager::Composer,
            PackageManager::Maven,
            PackageManager::Gradle,
            PackageManager::Nuget,
            PackageManager::Docker,
            PackageManager::GithubActions,
            PackageManager::Hex,
            PackageManager::Pub,
            PackageManager::Terraform,
            PackageManager::Swift,
            PackageManager::Bazel,
            PackageManager::Conda,
            PackageManager::Vcpkg,
            PackageManager::Submodules,
            PackageManager::Elm,
        ]
    }

    /// Returns true if `name` is an ecosystem identifier and so cannot name a group
    pub fn is_reserved_name(name: &str) -> bool {
        let name = name.trim();
        Self::all().iter().any(|pm| {
            pm.as_str().eq_ignore_ascii_case(name) || pm.ecosystem().eq_ignore_ascii_case(name)
        })
    }

    /// Normalises a dependency name the way this ecosystem compares names
    pub fn normalise_name(&self, name: &str) -> String {
        match self {
            PackageManager::Pip | PackageManager::Uv | PackageManager::Conda => PYTHON_SEPARATORS
                .replace_all(&name.to_lowercase(), "-")
                .into_owned(),
            PackageManager::Composer | PackageManager::Nuget => name.to_lowercase(),
            _ => name.to_string(),
        }
    }

    /// Returns true if two dependency names refer to the same package
    pub fn names_match(&self, a: &str, b: &str) -> bool {
        self.normalise_name(a) == self.normalise_name(b)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
