use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use modelgraph_commands::EngineConfig;
use modelgraph_core::ElementId;
use modelgraph_document::{Document, LoadIssue, Loaded};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the ownership tree of a document
    Tree { file: PathBuf },
    /// Report load issues, dangling references and structural violations
    Check { file: PathBuf },
    /// Load a document and write it back in canonical form
    Normalize {
        input: PathBuf,
        /// Output path; defaults to rewriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create an empty project
    New {
        name: String,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Tree { file } => {
            let Loaded { document, .. } = open(&file, &config)?;
            print!("{}", render_tree(&document));
        }
        Command::Check { file } => {
            let problems = check(&file, &config)?;
            for problem in &problems {
                println!("{problem}");
            }
            if !problems.is_empty() {
                bail!("{} problem(s) found in {}", problems.len(), file.display());
            }
            println!("{}: ok", file.display());
        }
        Command::Normalize { input, output } => {
            let output = output.unwrap_or_else(|| input.clone());
            normalize(&input, &output, &config)?;
        }
        Command::New { name, output } => {
            save(&Document::new(name), &output)?;
            info!(path = %output.display(), "Created project");
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    EngineConfig::from_json(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

fn open(path: &Path, config: &EngineConfig) -> Result<Loaded> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let loaded = Document::from_json(&raw, config.load_options())
        .with_context(|| format!("Failed to load {}", path.display()))?;
    info!(
        path = %path.display(),
        elements = loaded.document.len(),
        issues = loaded.report.issues.len(),
        "Loaded document"
    );
    Ok(loaded)
}

fn save(document: &Document, path: &Path) -> Result<()> {
    let json = document.to_json()?;
    fs::write(path, json + "\n").with_context(|| format!("Failed to write {}", path.display()))
}

fn check(path: &Path, config: &EngineConfig) -> Result<Vec<String>> {
    let Loaded { document, report } = open(path, config)?;
    let mut problems: Vec<String> = report.issues.iter().map(ToString::to_string).collect();
    let reported: Vec<(ElementId, ElementId)> = report
        .issues
        .iter()
        .filter_map(|issue| match issue {
            LoadIssue::UnresolvedReference { owner, target, .. } => Some((*owner, *target)),
            _ => None,
        })
        .collect();
    for dangling in document.dangling_references() {
        if reported.contains(&(dangling.owner, dangling.target)) {
            continue;
        }
        let owner = document
            .path_of(dangling.owner)
            .unwrap_or_else(|| dangling.owner.to_string());
        problems.push(format!(
            "{owner}: `{}` points at missing {}",
            dangling.field, dangling.target
        ));
    }
    problems.extend(document.validate().iter().map(ToString::to_string));
    Ok(problems)
}

fn normalize(input: &Path, output: &Path, config: &EngineConfig) -> Result<()> {
    let Loaded { document, report } = open(input, config)?;
    if report.skipped_subtrees() > 0 {
        bail!(
            "{} subtree(s) of {} could not be loaded; refusing to drop them",
            report.skipped_subtrees(),
            input.display()
        );
    }
    save(&document, output)
}

fn render_tree(document: &Document) -> String {
    let mut out = String::new();
    render_element(document, document.root_id(), 0, &mut out);
    out
}

fn render_element(document: &Document, id: ElementId, depth: usize, out: &mut String) {
    let Some(element) = document.find_by_id(id) else {
        return;
    };
    let _ = writeln!(
        out,
        "{:indent$}{} ({})",
        "",
        if element.name.is_empty() { "<unnamed>" } else { element.name.as_str() },
        element.kind(),
        indent = depth * 2
    );
    for child in element.children() {
        render_element(document, *child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgraph_core::ElementKind;
    use modelgraph_document::factory::new_record;
    use tempfile::tempdir;

    #[test]
    fn test_new_then_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shop.json");
        save(&Document::new("Shop"), &path).unwrap();

        let Loaded { document, report } = open(&path, &EngineConfig::default()).unwrap();
        assert!(report.is_clean());
        assert_eq!(
            render_tree(&document),
            "Shop (Project)\n  Model (UMLModel)\n  Profiles (UMLProfileRoot)\n"
        );
    }

    #[test]
    fn test_check_reports_dangling_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shop.json");
        let mut doc = Document::new("Shop");
        let model = doc.model().unwrap().id();
        let mut attribute_owner = new_record(ElementKind::Class, "User").unwrap();
        let mut attribute = new_record(ElementKind::Attribute, "username").unwrap();
        attribute.fields.insert(
            "type".into(),
            serde_json::json!({ "ref": ElementId::new().to_string() }),
        );
        attribute_owner.owned_elements.push(attribute);
        let user = doc.instantiate(&attribute_owner).unwrap();
        doc.add_child(model, user).unwrap();
        save(&doc, &path).unwrap();

        let problems = check(&path, &EngineConfig::default()).unwrap();
        assert_eq!(problems.len(), 1, "{problems:?}");
        assert!(problems[0].starts_with("Shop/Model/User/username"));
    }

    #[test]
    fn test_normalize_refuses_to_drop_subtrees() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        let doc = Document::new("Shop");
        let mut value = doc.to_value().unwrap();
        value["ownedElements"][0]["ownedElements"] = serde_json::json!([
            { "id": ElementId::new().to_string(), "kind": "UMLWidget", "name": "w" }
        ]);
        fs::write(&input, value.to_string()).unwrap();

        assert!(normalize(&input, &output, &EngineConfig::default()).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_config_file_enables_strict_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("engine.json");
        fs::write(&config_path, r#"{ "strict_load": true, "max_undo_depth": 5 }"#).unwrap();
        let config = load_config(Some(&config_path)).unwrap();
        assert!(config.strict_load);
        assert_eq!(config.max_undo_depth, 5);
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }
}
