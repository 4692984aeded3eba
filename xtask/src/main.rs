// Plan Lens - Build Task Runner
// Unified build system using cargo xtask pattern

use anyhow::{Context, Result};
use xshell::{cmd, Shell};

fn main() -> Result<()> {
    let sh = Shell::new()?;
    let args: Vec<_> = std::env::args().skip(1).collect();

    match args.first().map(|s| s.as_str()) {
        Some("build") => {
            let release = args.contains(&"--release".to_string());
            build(&sh, release)
        }
        Some("test") => test(&sh),
        Some("format") => {
            let check = args.contains(&"--check".to_string());
            format(&sh, check)
        }
        Some("clippy") => clippy(&sh),
        Some("fixtures") => analyze_fixtures(&sh),
        Some("clean") => clean(&sh),
        Some("ci") => ci(&sh),
        Some("dist") => dist(&sh),
        _ => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Plan Lens - Build Commands:");
    println!();
    println!("Usage: cargo xtask <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  build [--release]   Build the engine");
    println!("  test                Run all tests");
    println!("  format [--check]    Format code (check mode doesn't modify)");
    println!("  clippy              Run clippy checks");
    println!("  fixtures            Analyze every test fixture with the CLI");
    println!("  clean               Clean build artifacts");
    println!("  ci                  Run all CI checks (format + clippy + test + fixtures)");
    println!("  dist                Create distribution package (tar.gz)");
    println!();
    println!("Examples:");
    println!("  cargo xtask build --release");
    println!("  cargo xtask format --check");
    println!("  cargo xtask fixtures");
}

/// Build the engine crate
fn build(sh: &Shell, release: bool) -> Result<()> {
    println!("🦀 Building plan-lens{}...", if release { " (release)" } else { "" });
    let _dir = sh.push_dir(project_root());

    if release {
        cmd!(sh, "cargo build --release -p plan-lens")
            .run()
            .context("Failed to build engine in release mode")?;
    } else {
        cmd!(sh, "cargo build -p plan-lens")
            .run()
            .context("Failed to build engine")?;
    }

    println!("✅ Build complete");
    Ok(())
}

/// Run all tests
fn test(sh: &Shell) -> Result<()> {
    println!("🧪 Running tests...");
    println!();

    let _dir = sh.push_dir(project_root());

    cmd!(sh, "cargo test --workspace")
        .run()
        .context("Tests failed")?;

    println!();
    println!("✅ All tests passed!");

    Ok(())
}

/// Format code
fn format(sh: &Shell, check: bool) -> Result<()> {
    println!("📝 Formatting Rust code...");
    let _dir = sh.push_dir(project_root());

    if check {
        cmd!(sh, "cargo fmt --all -- --check")
            .run()
            .context("Rust code is not formatted")?;
        println!("✅ Rust code is properly formatted");
    } else {
        cmd!(sh, "cargo fmt --all")
            .run()
            .context("Failed to format Rust code")?;
        println!("✅ Rust code formatted");
    }

    Ok(())
}

/// Run clippy checks
fn clippy(sh: &Shell) -> Result<()> {
    let _dir = sh.push_dir(project_root());

    cmd!(sh, "cargo clippy --release --all-targets -- --deny warnings --allow clippy::uninlined-format-args")
        .run()
        .context("Clippy checks failed")?;

    Ok(())
}

/// Run `plan-lens analyze` over every fixture document
fn analyze_fixtures(sh: &Shell) -> Result<()> {
    println!("🔍 Analyzing fixtures...");
    println!();

    let project = project_root();
    let fixtures = project.join("engine/tests/fixtures/plans");
    let out_dir = project.join("build/fixtures");
    std::fs::create_dir_all(&out_dir).context("Failed to create output directory")?;

    let _dir = sh.push_dir(&project);
    let mut count = 0;
    for entry in std::fs::read_dir(&fixtures).context("Failed to list fixtures")? {
        let input = entry?.path();
        if input.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(name) = input.file_name() else {
            continue;
        };
        let output = out_dir.join(name);

        cmd!(sh, "cargo run -q -p plan-lens -- analyze --deterministic-ids --input {input} --output {output}")
            .env("APP_OUTPUT_PRETTY", "true")
            .run()
            .with_context(|| format!("Failed to analyze {}", input.display()))?;
        println!("   {} -> {}", input.display(), output.display());
        count += 1;
    }

    println!();
    println!("✅ Analyzed {} fixtures into build/fixtures/", count);

    Ok(())
}

/// Clean build artifacts
fn clean(sh: &Shell) -> Result<()> {
    println!("🧹 Cleaning build artifacts...");

    let project = project_root();
    let _dir = sh.push_dir(&project);
    cmd!(sh, "cargo clean").run()?;

    let build_dir = project.join("build");
    if build_dir.exists() {
        cmd!(sh, "rm -rf {build_dir}").run()?;
    }

    println!("✅ Clean complete!");

    Ok(())
}

/// Run all CI checks (format + clippy + test + fixtures)
fn ci(sh: &Shell) -> Result<()> {
    println!("🔄 Running CI pipeline...");
    println!();

    println!("📝 [1/4] Checking code format...");
    format(sh, true)?;
    println!();

    println!("🔍 [2/4] Running clippy checks...");
    clippy(sh)?;
    println!("✅ Clippy checks passed");
    println!();

    println!("🧪 [3/4] Running tests...");
    test(sh)?;
    println!();

    println!("📊 [4/4] Analyzing fixtures...");
    analyze_fixtures(sh)?;
    println!();

    println!("🎉 CI pipeline completed successfully!");

    Ok(())
}

/// Create distribution package (tar.gz) with the binary and a default config
fn dist(sh: &Shell) -> Result<()> {
    println!("📦 Creating distribution package...");
    println!();

    build(sh, true)?;

    let project = project_root();
    let dist_dir = project.join("build/dist");
    cmd!(sh, "mkdir -p {dist_dir}/bin").run()?;
    cmd!(sh, "mkdir -p {dist_dir}/conf").run()?;
    cmd!(sh, "mkdir -p {dist_dir}/logs").run()?;

    let binary_src = project.join("target/release/plan-lens");
    let binary_dst = dist_dir.join("bin/plan-lens");
    cmd!(sh, "cp {binary_src} {binary_dst}").run()?;
    create_config_file(&dist_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let package_name = format!("plan-lens-{}.tar.gz", timestamp);
    let package_path = dist_dir.join(&package_name);

    println!("📋 Creating tarball: {}...", package_name);
    let _dir = sh.push_dir(&dist_dir);
    cmd!(sh, "tar czf {package_name} bin conf logs")
        .run()
        .context("Failed to create tarball")?;

    println!();
    println!("✅ Distribution package created!");
    println!("   Location: {}", package_path.display());

    Ok(())
}

/// Create default config file
fn create_config_file(dist_dir: &std::path::Path) -> Result<()> {
    let config_path = dist_dir.join("conf/config.toml");
    let config_content = r#"[logging]
level = "info,plan_lens=debug"
file = "logs/plan-lens.log"

[analyzer]
hidden_node_names = ["AdaptiveSparkPlan", "InputAdapter", "ColumnarToRow", "RowToColumnar", "WholeStageCodegen"]
row_count_metric_names = ["number of output rows", "num output rows", "output rows"]

[output]
pretty = false
"#;

    std::fs::write(config_path, config_content).context("Failed to create config file")?;

    Ok(())
}

/// Get project root directory
fn project_root() -> std::path::PathBuf {
    std::path::Path::new(&env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(1)
        .unwrap()
        .to_path_buf()
}
