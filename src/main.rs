use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sharesweep::cli::{self, Cli, Commands};
use sharesweep::colors;
use sharesweep::config::{Backend, Config, LocalSettings};
use sharesweep::eraser::{EraseError, EraseEvent, EraseReport, Eraser, ObjectKind};
use sharesweep::logbook::LogBook;
use sharesweep::migrate::{self, CopySummary, FolderMapping};
use sharesweep::restructure::{self, Change, Rename, RestructurePlan};
use sharesweep::store::{self, RemoteStore};
use sharesweep::{Browser, MenuAction, Navigation};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Disable colors if requested
    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose)?;

    if let Commands::ShowHelp = cli.command {
        Cli::print_help();
        return Ok(());
    }

    // Handle safe mode
    if cli.safe {
        println!("{}", "🔒 SAFE MODE ENABLED".bold().color(colors::WARNING));
        println!("   Showing previews only - nothing will be modified");
        println!();
    }

    let config = load_config(&cli).context("Failed to load configuration")?;

    if let Commands::Config = cli.command {
        config.display();
        return Ok(());
    }

    let store = store::open(&config.backend)?;
    let book = LogBook::new(&config.log_sheet);

    match &cli.command {
        Commands::Browse(args) => handle_browse(&*store, &config, &book, args, cli.safe)?,
        Commands::Erase(args) => handle_erase(&*store, &config, &book, args, cli.safe)?,
        Commands::List(args) => handle_list(&*store, &args.path)?,
        Commands::Store(args) => handle_store(&*store, &book, &args.path)?,
        Commands::CopyFolder(args) => {
            handle_copy_folder(&*store, &book, &args.source, &args.destination, cli.safe)?
        }
        Commands::StructureCopy(args) => {
            handle_structure_copy(&*store, &config, &book, &args.source, &args.destination, cli.safe)?
        }
        Commands::CopyFolders(args) => {
            handle_copy_folders(&*store, &config, &book, &args.source, &args.destination, cli.safe)?
        }
        Commands::CopyFiles(args) => {
            handle_copy_files(&*store, &book, &args.source, &args.destination, cli.safe)?
        }
        Commands::Restructure(args) => handle_restructure(&*store, &book, args, cli.safe)?,
        Commands::Config | Commands::ShowHelp => unreachable!(),
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Failed to parse log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match (&cli.config, &cli.local) {
        (Some(path), _) => Config::load_from(path)?,
        (None, Some(root)) if !Config::config_path()?.exists() => Config::local(root.clone()),
        (None, _) => Config::load()?,
    };

    if let Some(root) = &cli.local {
        config.backend = Backend::Local(LocalSettings { root: root.clone() });
    }
    Ok(config)
}

fn display_banner(state: &str) {
    let line = "*".repeat(34);
    println!("{}", line.color(colors::HEADER));
    println!("{}", format!("*****  SHARESWEEP {:<8} *****", state).bold());
    println!("{}", line.color(colors::HEADER));
    println!();
}

fn handle_browse(
    store: &dyn RemoteStore,
    config: &Config,
    book: &LogBook,
    args: &cli::BrowseArgs,
    safe_mode: bool,
) -> Result<()> {
    let theme = ColorfulTheme::default();
    display_banner("BROWSER");
    println!("{} {}", "📚".cyan(), store.describe());
    println!();

    // Keep asking until the start folder exists
    let mut start = args.path.clone();
    let mut browser = loop {
        let path = match start.take() {
            Some(path) => path,
            None => Input::with_theme(&theme)
                .with_prompt("Provide directory path")
                .interact_text()?,
        };
        match Browser::open(store, &path) {
            Ok(browser) => break browser,
            Err(e) => println!("{} {}", "⚠️".yellow(), e),
        }
    };

    loop {
        println!();
        println!("{} {}", "📂".color(colors::HEADER), browser.current().color(colors::PATH));
        if !browser.at_start() {
            println!("   started in {}", browser.start().dimmed());
        }
        println!("   {} folders", browser.entries().len());

        let options = browser.options();
        let index = Select::with_theme(&theme)
            .with_prompt("Choose option")
            .items(&options)
            .default(0)
            .interact()?;

        match browse_step(&mut browser, config, book, index, safe_mode, &theme) {
            Ok(Navigation::Exit) => break,
            Ok(Navigation::Moved) => {}
            Err(e) => println!("{} {:#}", "❌".red(), e),
        }
    }

    display_banner("EXIT");
    Ok(())
}

fn browse_step(
    browser: &mut Browser<'_, dyn RemoteStore + '_>,
    config: &Config,
    book: &LogBook,
    index: usize,
    safe_mode: bool,
    theme: &ColorfulTheme,
) -> Result<Navigation> {
    let store = browser.store();
    let action = MenuAction::from_index(index, browser.entries().len())?;

    match action {
        MenuAction::Exit => return Ok(Navigation::Exit),
        MenuAction::Back => return Ok(browser.back()?),
        MenuAction::Open(i) => browser.enter(i)?,
        MenuAction::Store => {
            let written = book.append_block(browser.entries())?;
            println!("{} Logged {} folder names to {}", "📝".green(), written, book.path().display());
        }
        MenuAction::CopyFolder => {
            let destination: String = Input::with_theme(theme)
                .with_prompt("Introduce path of the destination folder")
                .interact_text()?;
            handle_copy_folder(store, book, browser.current(), &destination, safe_mode)?;
        }
        MenuAction::StructureCopy => {
            let destination: String = Input::with_theme(theme)
                .with_prompt("Introduce path of the destination folder")
                .interact_text()?;
            handle_structure_copy(store, config, book, browser.current(), &destination, safe_mode)?;
        }
        MenuAction::CopyFiles => {
            let destination: String = Input::with_theme(theme)
                .with_prompt("Introduce path of the file destination")
                .interact_text()?;
            handle_copy_files(store, book, browser.current(), &destination, safe_mode)?;
        }
        MenuAction::Erase => {
            let target = browser.current().to_string();
            preview_erase(store, config, &target)?;
            if safe_mode {
                return Ok(Navigation::Moved);
            }
            let confirmed = Confirm::with_theme(theme)
                .with_prompt(format!("Erase {} and everything beneath it?", target))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{} Erase cancelled", "ℹ️".cyan());
                return Ok(Navigation::Moved);
            }
            run_erase(store, config, book, &target)?;
            return Ok(browser.current_removed()?);
        }
    }
    Ok(Navigation::Moved)
}

fn handle_erase(
    store: &dyn RemoteStore,
    config: &Config,
    book: &LogBook,
    args: &cli::EraseArgs,
    safe_mode: bool,
) -> Result<()> {
    if safe_mode || args.dry_run {
        preview_erase(store, config, &args.path)?;
        println!("{} DRY RUN: nothing was deleted", "🌵".yellow());
        return Ok(());
    }

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Erase {} and everything beneath it?", args.path))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{} Erase cancelled", "ℹ️".cyan());
            return Ok(());
        }
    }

    run_erase(store, config, book, &args.path)?;
    Ok(())
}

fn preview_erase(store: &dyn RemoteStore, config: &Config, target: &str) -> Result<()> {
    let planned = Eraser::new(store)
        .max_depth(config.max_depth)
        .plan(target)
        .with_context(|| format!("Failed to walk {}", target))?;

    println!();
    println!("{} {}", "🧹 ERASE PREVIEW".bold().color(colors::HEADER), target.dimmed());
    println!("{}", "─".repeat(50).color(colors::PATH));

    if planned.is_empty() {
        println!("{} {} does not exist, nothing to erase", "ℹ️".cyan(), target);
        return Ok(());
    }

    let mut files = 0;
    for (i, deletion) in planned.iter().enumerate() {
        let icon = match deletion.kind {
            ObjectKind::File => {
                files += 1;
                "📄"
            }
            ObjectKind::Folder => "📁",
        };
        println!("{:4}. {} {}", i + 1, icon, deletion.path.color(colors::PATH));
    }

    println!();
    println!("{} Would delete {} files and {} folders",
        "📊".cyan(),
        files,
        planned.len() - files
    );
    Ok(())
}

fn run_erase(store: &dyn RemoteStore, config: &Config, book: &LogBook, target: &str) -> Result<EraseReport> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} deleted {msg}")?
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let progress = pb.clone();
    let result = Eraser::new(store)
        .max_depth(config.max_depth)
        .on_event(move |event| match event {
            EraseEvent::Descended(path) => progress.set_message(path.to_string()),
            EraseEvent::FileDeleted(_) | EraseEvent::FolderDeleted(_) => progress.inc(1),
            EraseEvent::FileSkipped { path, error } => {
                progress.println(format!("{} {} ({})", "⚠️".yellow(), path, error));
            }
        })
        .erase(target);
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            println!("{} Erased {} ({} files, {} folders)",
                "✅".green(),
                target.color(colors::PATH),
                report.deleted_files.len().to_string().color(colors::SUCCESS),
                report.deleted_folders.len().to_string().color(colors::SUCCESS)
            );
            if let Err(e) = book.log_item(&format!("Erased {}", target)) {
                warn!(error = %e, "could not update log sheet");
            }
            Ok(report)
        }
        Err(EraseError::Incomplete { path, report }) => {
            print_incomplete(&report);
            if let Err(e) = book.append_block(
                report.warnings.iter().map(|w| format!("Could not delete {}", w.path)),
            ) {
                warn!(error = %e, "could not update log sheet");
            }
            Err(anyhow!(
                "{} was only partly erased; clear the files above and run again",
                path
            ))
        }
        Err(e) => Err(anyhow::Error::from(e)
            .context(format!("Erase of {} stopped; it is safe to run again", target))),
    }
}

fn print_incomplete(report: &EraseReport) {
    println!();
    println!("{}", "⚠️  SOME ITEMS COULD NOT BE DELETED".bold().color(colors::DANGER));
    println!("{}", "─".repeat(50).color(colors::PATH));
    println!("{} {} files, {} folders deleted",
        "•".cyan(),
        report.deleted_files.len(),
        report.deleted_folders.len()
    );
    for warning in &report.warnings {
        println!("  📄 {} ({})", warning.path.color(colors::PATH), warning.error);
    }
    for folder in &report.stuck_folders {
        println!("  📁 {}", folder.color(colors::PATH));
    }
}

fn handle_list(store: &dyn RemoteStore, path: &str) -> Result<()> {
    let folders = store
        .list_subfolders(path)
        .with_context(|| format!("Failed to list folders of {}", path))?;
    let files = store
        .list_files(path)
        .with_context(|| format!("Failed to list files of {}", path))?;

    println!("{} {}", "📂".color(colors::HEADER), path.color(colors::PATH));
    println!("Number of folders: {}", folders.len());
    for folder in &folders {
        println!("  📁 {}", folder);
    }
    println!("Number of files: {}", files.len());
    for file in &files {
        println!("  📄 {}", file);
    }
    Ok(())
}

fn handle_store(store: &dyn RemoteStore, book: &LogBook, path: &str) -> Result<()> {
    let folders = store
        .list_subfolders(path)
        .with_context(|| format!("Failed to list folders of {}", path))?;
    let written = book.append_block(&folders)?;
    println!("{} Log sheet {} was updated ({} entries)",
        "📝".green(),
        book.path().display(),
        written
    );
    Ok(())
}

fn handle_copy_folders(
    store: &dyn RemoteStore,
    config: &Config,
    book: &LogBook,
    source: &str,
    destination: &str,
    safe_mode: bool,
) -> Result<()> {
    let mapping = FolderMapping::new(config.folder_mapping.clone());

    if safe_mode {
        let folders = store
            .list_subfolders(source)
            .with_context(|| format!("Failed to list folders of {}", source))?;
        println!("{} Would copy {} folders:", "🌵".yellow(), folders.len());
        for name in &folders {
            println!("  {} → {}", name, mapping.destination_for(name, destination).color(colors::PATH));
        }
        return Ok(());
    }

    let summary = migrate::copy_subfolders(store, source, destination, &mapping)
        .with_context(|| format!("Failed to copy folders of {}", source))?;
    report_copies(book, &summary)
}

fn handle_copy_folder(
    store: &dyn RemoteStore,
    book: &LogBook,
    source: &str,
    destination: &str,
    safe_mode: bool,
) -> Result<()> {
    if safe_mode {
        println!("{} Would copy {} into {}", "🌵".yellow(), source, destination.color(colors::PATH));
        return Ok(());
    }

    let summary = migrate::copy_folder_into(store, source, destination)
        .with_context(|| format!("Failed to copy {}", source))?;
    report_copies(book, &summary)
}

fn handle_structure_copy(
    store: &dyn RemoteStore,
    config: &Config,
    book: &LogBook,
    source: &str,
    destination: &str,
    safe_mode: bool,
) -> Result<()> {
    let mapping = FolderMapping::new(config.folder_mapping.clone());
    if mapping.is_empty() {
        println!("{} No folder mapping configured, every subfolder is copied whole", "ℹ️".cyan());
    }

    if safe_mode {
        let files = store
            .list_files(source)
            .with_context(|| format!("Failed to list files of {}", source))?;
        let folders = store
            .list_subfolders(source)
            .with_context(|| format!("Failed to list folders of {}", source))?;
        println!("{} Would copy {} files into {}", "🌵".yellow(), files.len(), destination.color(colors::PATH));
        for name in &folders {
            let verb = if mapping.maps(name) { "merge" } else { "copy" };
            println!("  {} {} → {}", verb, name, mapping.destination_for(name, destination).color(colors::PATH));
        }
        return Ok(());
    }

    let summary = migrate::structure_copy(store, source, destination, &mapping)
        .with_context(|| format!("Failed to copy the structure of {}", source))?;
    report_copies(book, &summary)
}

fn handle_copy_files(
    store: &dyn RemoteStore,
    book: &LogBook,
    source: &str,
    destination: &str,
    safe_mode: bool,
) -> Result<()> {
    if safe_mode {
        let files = store
            .list_files(source)
            .with_context(|| format!("Failed to list files of {}", source))?;
        println!("{} Would copy {} files into {}", "🌵".yellow(), files.len(), destination.color(colors::PATH));
        return Ok(());
    }

    let summary = migrate::copy_files(store, source, destination)
        .with_context(|| format!("Failed to copy files of {}", source))?;
    report_copies(book, &summary)
}

fn report_copies(book: &LogBook, summary: &CopySummary) -> Result<()> {
    for (from, to) in &summary.copied {
        println!("{} Copied '{}' into '{}'", "✅".green(), from, to.color(colors::PATH));
    }
    for failure in &summary.failures {
        println!("{} '{}' → '{}': {}", "❌".red(), failure.from, failure.to, failure.error);
    }

    if !summary.copied.is_empty() {
        let lines = summary.copied.iter().map(|(from, to)| format!("Copied {} -> {}", from, to));
        if let Err(e) = book.append_block(lines) {
            warn!(error = %e, "could not update log sheet");
        }
    }

    if !summary.is_clean() {
        bail!("{} of {} copies failed",
            summary.failures.len(),
            summary.failures.len() + summary.copied.len()
        );
    }
    Ok(())
}

fn handle_restructure(
    store: &dyn RemoteStore,
    book: &LogBook,
    args: &cli::RestructureArgs,
    safe_mode: bool,
) -> Result<()> {
    let rename = match args.rename.as_deref() {
        Some([from, to]) => Some(Rename { from: from.clone(), to: to.clone() }),
        Some(_) => bail!("--rename takes exactly two names: FROM TO"),
        None => None,
    };
    if rename.is_none() && args.create.is_empty() {
        bail!("Nothing to do: pass --rename FROM TO and/or --create NAME");
    }

    let plan = RestructurePlan {
        root: args.root.clone(),
        rename,
        create: args.create.clone(),
    };

    if safe_mode {
        let units = store
            .list_subfolders(&plan.root)
            .with_context(|| format!("Failed to list {}", plan.root))?;
        println!("{} Would restructure {} units under {}", "🌵".yellow(), units.len(), plan.root.color(colors::PATH));
        if let Some(rename) = &plan.rename {
            println!("  rename {} → {}", rename.from, rename.to);
        }
        for name in &plan.create {
            println!("  create {}", name);
        }
        return Ok(());
    }

    let summary = restructure::restructure(store, &plan)
        .with_context(|| format!("Failed to restructure {}", plan.root))?;

    let mut lines = Vec::new();
    for change in &summary.changes {
        let line = match change {
            Change::Renamed { from, to } => format!("Renamed {} -> {}", from, to),
            Change::Created(path) => format!("Created {}", path),
            Change::SkippedRename(path) => format!("Skipped rename of {}", path),
        };
        println!("{} {}", "•".cyan(), line);
        lines.push(line);
    }
    for failure in &summary.failures {
        println!("{} {}: {}", "❌".red(), failure.path, failure.error);
    }
    if !lines.is_empty() {
        if let Err(e) = book.append_block(&lines) {
            warn!(error = %e, "could not update log sheet");
        }
    }

    println!("{} {} units, {} changes", "📊".cyan(), summary.units, summary.changes.len());
    if !summary.failures.is_empty() {
        bail!("{} changes failed", summary.failures.len());
    }
    Ok(())
}
