use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use pt_dashboard::charts::{DashboardView, Summary};
use pt_dashboard::export::{self, EXPORT_FILE_NAME};
use pt_dashboard::filter::{FilterSelection, FilteredView, NameSearch};
use pt_dashboard::models::{Config, Dataset, Field};
use pt_dashboard::render;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const CHARTS_FILE_NAME: &str = "charts.json";

fn cli() -> Command {
    Command::new("pt-dashboard")
        .version("0.1")
        .about("Summaries, map and charts for Indonesian higher-education institutions")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .value_name("FILE")
                .help("Dataset CSV (overrides data_file)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory (overrides output_directory)"),
        )
        .arg(
            Arg::new("province")
                .short('p')
                .long("province")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Keep only this province (repeatable)"),
        )
        .arg(
            Arg::new("organizer")
                .long("organizer")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Keep only this organizer (repeatable)"),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Keep only this status (repeatable)"),
        )
        .arg(
            Arg::new("search")
                .short('s')
                .long("search")
                .value_name("TERM")
                .help("Case-insensitive institution name search for the table and export"),
        )
        .arg(
            Arg::new("list-options")
                .long("list-options")
                .action(ArgAction::SetTrue)
                .help("Print the selectable filter values and exit"),
        )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let matches = cli().get_matches();
    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to read configuration: {}", config_file))?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        default_config
    };
    apply_overrides(&mut config, &matches);

    println!("📂 Reading dataset from: {}", config.data_file);
    let dataset = pt_dashboard::load_dataset(Path::new(&config.data_file), config.geometry_policy)
        .with_context(|| format!("Failed to load dataset: {}", config.data_file))?;
    println!(
        "   ✅ Loaded {} rows, {} province boundaries",
        dataset.len(),
        dataset.boundaries().len()
    );

    if matches.get_flag("list-options") {
        print_options(&dataset);
        return Ok(());
    }

    let selection = FilterSelection::from_config(&config.filters);
    for (field, value) in selection.unknown_values(&dataset) {
        println!("   ⚠️  {} '{}' does not occur in the dataset", field.column_name(), value);
    }
    let search = NameSearch::new(config.filters.search.as_deref());

    let filtered = selection.apply(&dataset);
    let table = search.apply(&filtered);
    let view = DashboardView::build(&dataset, &filtered, &table);

    let output_dir = config.output_directory.as_deref().unwrap_or("output");
    fs::create_dir_all(output_dir)?;
    clean_output_directory(output_dir)?;
    println!("📄 Output directory: {} (cleaned)", output_dir);

    print_summary(&view.summary);
    generate_charts_json(&view, output_dir)?;
    let rendered = render::render_dashboard(&view, Path::new(output_dir), &config.render)
        .context("Failed to render charts")?;
    for path in rendered {
        println!("   🗺️  {}", path.display());
    }
    generate_export(&dataset, &table, output_dir)?;

    if view.stacked_bar.no_data {
        println!("\n⚠️  No rows match the selected filters");
    }
    if search.is_active() {
        println!(
            "🔎 Name search kept {} of {} rows for the table",
            table.len(),
            filtered.len()
        );
    }

    println!("\n✅ Dashboard complete!");
    println!("📂 Results: {}", output_dir);
    Ok(())
}

fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(data) = matches.get_one::<String>("data") {
        config.data_file = data.clone();
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_directory = Some(output.clone());
    }
    if let Some(search) = matches.get_one::<String>("search") {
        config.filters.search = Some(search.clone());
    }

    let appended = [
        ("province", &mut config.filters.provinces),
        ("organizer", &mut config.filters.organizers),
        ("status", &mut config.filters.statuses),
    ];
    for (arg, values) in appended {
        if let Some(extra) = matches.get_many::<String>(arg) {
            values.extend(extra.cloned());
        }
    }
}

fn clean_output_directory(output_dir: &str) -> Result<()> {
    let generated = [
        CHARTS_FILE_NAME,
        EXPORT_FILE_NAME,
        render::MAP_FILE_NAME,
        render::BAR_FILE_NAME,
        render::STACKED_FILE_NAME,
    ];
    for name in generated {
        let path = Path::new(output_dir).join(name);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove old output: {}", path.display()))?;
        }
    }
    Ok(())
}

fn print_options(dataset: &Dataset) {
    println!("\n🔎 FILTER OPTIONS");
    println!("=================");
    for field in [Field::Province, Field::Organizer, Field::Status] {
        let options = dataset.options(field);
        println!("\n{} ({}):", field.column_name(), options.len());
        for option in options {
            println!("   - {}", option);
        }
    }
}

fn print_summary(summary: &Summary<'_>) {
    println!("\n📌 SUMMARY");
    println!("==========");
    println!("Jumlah Perguruan Tinggi: {}", summary.institutions);
    println!("Provinsi Tercakup: {}", summary.provinces_covered);
    println!("Penyelenggara:");
    for organizer in &summary.organizers {
        println!("   - {}", organizer);
    }
    println!();
}

fn generate_charts_json(view: &DashboardView<'_>, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join(CHARTS_FILE_NAME);
    let content = serde_json::to_string_pretty(view)?;
    fs::write(&path, content)?;
    println!("   📊 {}", path.display());
    Ok(())
}

fn generate_export(dataset: &Dataset, table: &FilteredView<'_>, output_dir: &str) -> Result<()> {
    export::export_to_dir(dataset.layout(), table, Path::new(output_dir))
        .context("Failed to write filtered data")?;
    println!(
        "   📥 {} ({} rows)",
        Path::new(output_dir).join(EXPORT_FILE_NAME).display(),
        table.len()
    );
    Ok(())
}
