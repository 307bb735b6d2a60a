//! Scaffold a starter project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::commands::project_root;

/// Files written by `kiln init`, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("src/templates/layouts/default.html", DEFAULT_LAYOUT),
    ("src/templates/partials/nav.html", DEFAULT_NAV),
    ("src/templates/data/site.json", DEFAULT_SITE_DATA),
    ("src/index.html", DEFAULT_INDEX),
    ("src/assets/scss/main.scss", DEFAULT_STYLES),
    ("src/assets/scss/_variables.scss", DEFAULT_VARIABLES),
    ("src/assets/js/main.js", DEFAULT_SCRIPT),
    ("src/assets/js/lib/greet.js", DEFAULT_GREET),
];

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing kiln project...");

    let root = project_root(config_path);

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    for (relative, contents) in SCAFFOLD {
        let path = root.join(relative);
        if path.exists() && !yes {
            tracing::debug!("Keeping existing {}", relative);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'kiln' to build and start the development server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Kiln Configuration

[paths]
# Source tree
src = "src"

# Output tree (deleted and rebuilt by `kiln build`)
dist = "dist"

[server]
host = "127.0.0.1"
port = 3000
open = true

[watch]
# Quiet period before a changed category rebuilds
debounce_ms = 100

[css]
# Browserslist queries for vendor prefixes
browsers = ["defaults"]
min_suffix = ".min"

[images]
jpeg_quality = 80
"#;

const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ title }} | {{ site.name }}</title>
  <link rel="stylesheet" href="{{ root }}assets/css/main.min.css">
</head>
<body>
  {% include "nav" %}
  <main>
    {{ body }}
  </main>
  <script src="{{ root }}assets/js/main.min.js"></script>
</body>
</html>
"#;

const DEFAULT_NAV: &str = r#"<nav>
  <a href="{{ root }}index.html">{{ site.name }}</a>
</nav>
"#;

const DEFAULT_SITE_DATA: &str = r#"{
  "name": "My Site"
}
"#;

const DEFAULT_INDEX: &str = r#"---
title: Home
---
<h1>Welcome to {{ site.name }}</h1>
<p>Edit <code>src/index.html</code> and save to reload.</p>
"#;

const DEFAULT_STYLES: &str = r#"@import "variables";

body {
  margin: 0;
  font-family: $font-stack;

  main {
    max-width: 48rem;
    margin: 2rem auto;
    padding: 0 1rem;
  }
}
"#;

const DEFAULT_VARIABLES: &str = r#"$font-stack: system-ui, sans-serif;
"#;

const DEFAULT_SCRIPT: &str = r#"//= lib/greet.js

greet(document.title);
"#;

const DEFAULT_GREET: &str = r#"function greet(name) {
  console.log('Hello from ' + name);
}
"#;
