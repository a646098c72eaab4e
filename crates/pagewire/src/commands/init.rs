//! Scaffold a new site.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Files written by `init`, relative to the project directory.
const SCAFFOLD: &[(&str, &str)] = &[
    ("pagewire.toml", DEFAULT_CONFIG),
    ("src/index.html", DEFAULT_INDEX),
    ("src/about.html", DEFAULT_ABOUT),
    ("src/partials/header.html", DEFAULT_HEADER),
    ("src/styles/main.css", DEFAULT_STYLES),
    ("public/robots.txt", DEFAULT_ROBOTS),
];

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing pagewire site...");

    let written = scaffold(Path::new("."), yes)?;
    for path in &written {
        tracing::info!("Created {}", path.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'pagewire dev' to start the development server.");

    Ok(())
}

/// Write the starter files below `dir`.
///
/// Existing files are kept unless `overwrite` is set. Returns the files
/// that were written.
fn scaffold(dir: &Path, overwrite: bool) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (relative, content) in SCAFFOLD {
        let path = dir.join(relative);
        if path.exists() && !overwrite {
            tracing::warn!("{} already exists. Use --yes to overwrite.", relative);
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        written.push(PathBuf::from(relative));
    }

    Ok(written)
}

const DEFAULT_CONFIG: &str = r#"# Pagewire Configuration

[site]
# Directory containing pages and shared fragments
root = "src"

# Public base path; "./" keeps URLs relative to each page
base = "./"

# Copied verbatim into the output
public_dir = "public"

# Output directory for built site
out_dir = "dist"

# Shared fragment directories, never built as pages
partials = ["partials", "components", "layout"]

[css]
# One stylesheet per source file
code_split = true

[build]
minify = false

# Inline assets smaller than this many bytes (0 disables)
assets_inline_limit = 0

empty_out_dir = true
"#;

const DEFAULT_INDEX: &str = r#"<!-- @pageTitle Home -->
<!-- @pageNote Landing page -->
<!-- @pageCreated 2024-01-01 -->
<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ page.title }}</title>
  <link rel="stylesheet" href="./styles/main.css">
</head>
<body>
  {% include "header" %}
  <main>
    <h1>{{ page.title }}</h1>
    <p>{{ page.note }}</p>
  </main>
</body>
</html>
"#;

const DEFAULT_ABOUT: &str = r#"<!-- @pageTitle About -->
<!-- @pageCreated 2024-01-01 -->
<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ page.title }}</title>
  <link rel="stylesheet" href="./styles/main.css">
</head>
<body>
  {% include "header" %}
  <main>
    <h1>{{ page.title }}</h1>
  </main>
</body>
</html>
"#;

const DEFAULT_HEADER: &str = r#"<header>
  <nav>
    <ul>
      {% for p in pages %}
      <li><a href="./{{ p.path }}">{{ p.title }}</a></li>
      {% endfor %}
    </ul>
  </nav>
</header>
"#;

const DEFAULT_STYLES: &str = r#"body {
  font-family: system-ui, sans-serif;
  margin: 0 auto;
  max-width: 48rem;
}

nav ul {
  display: flex;
  gap: 1rem;
  list-style: none;
}
"#;

const DEFAULT_ROBOTS: &str = "User-agent: *\nAllow: /\n";
