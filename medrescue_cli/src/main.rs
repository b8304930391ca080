use clap::{Parser, Subcommand};
use medrescue_core::*;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medrescue")]
#[command(about = "Emergency medication reference, dose calculator and protocol runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List medications
    Meds {
        /// Only medications in this category (exact match)
        #[arg(long)]
        category: Option<String>,

        /// Only medications with a matching indication
        #[arg(long)]
        indication: Option<String>,

        /// Free-text search over name, generic name, category and indications
        #[arg(long)]
        search: Option<String>,

        /// Only high-alert medications
        #[arg(long)]
        high_alert: bool,
    },

    /// Show one medication in detail
    Show {
        medication_id: String,

        /// Also calculate weight-based doses for this weight (kg)
        #[arg(long)]
        weight: Option<f64>,
    },

    /// Calculate weight-based doses for a medication
    Calc {
        medication_id: String,

        /// Patient weight in kilograms
        #[arg(long, allow_negative_numbers = true)]
        weight: f64,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in protocols
    Protocols,

    /// Step through a protocol
    Run {
        protocol_id: String,

        /// Comma-separated commands to run instead of prompting (e.g. "n,n,1,w")
        #[arg(long, value_delimiter = ',')]
        script: Option<Vec<String>>,

        /// Use a simulated clock so timer waits finish instantly
        #[arg(long)]
        simulated_clock: bool,

        /// Print the final session state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle a favorite medication
    Fav { medication_id: String },

    /// List favorites and recently viewed items
    Favs {
        /// Clear recent searches and medications
        #[arg(long)]
        clear_recents: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    medrescue_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    match cli.command {
        Commands::Meds {
            category,
            indication,
            search,
            high_alert,
        } => cmd_meds(catalog, &config, category, indication, search, high_alert),
        Commands::Show {
            medication_id,
            weight,
        } => cmd_show(catalog, &config, &medication_id, weight),
        Commands::Calc {
            medication_id,
            weight,
            json,
        } => cmd_calc(catalog, &medication_id, weight, json),
        Commands::Protocols => cmd_protocols(catalog),
        Commands::Run {
            protocol_id,
            script,
            simulated_clock,
            json,
        } => cmd_run(catalog, &config, &protocol_id, script, simulated_clock, json),
        Commands::Fav { medication_id } => cmd_fav(catalog, &config, &medication_id),
        Commands::Favs { clear_recents } => cmd_favs(catalog, &config, clear_recents),
    }
}

fn lookup<'a>(catalog: &'a Catalog, medication_id: &str) -> Result<&'a Medication> {
    catalog
        .get(medication_id)
        .ok_or_else(|| Error::Other(format!("Unknown medication: {}", medication_id)))
}

fn cmd_meds(
    catalog: &Catalog,
    config: &Config,
    category: Option<String>,
    indication: Option<String>,
    search: Option<String>,
    high_alert: bool,
) -> Result<()> {
    let mut meds = match &search {
        Some(query) => catalog.search(query),
        None => catalog.all_medications(),
    };

    if let Some(category) = &category {
        meds.retain(|m| &m.category == category);
    }
    if let Some(indication) = &indication {
        let matching = catalog.by_indication(indication);
        meds.retain(|m| matching.iter().any(|x| x.id == m.id));
    }
    if high_alert {
        meds.retain(|m| m.is_high_alert());
    }

    if let Some(query) = &search {
        let limits = config.recents.clone();
        Preferences::update(&config.preferences_path(), |prefs| {
            prefs.add_recent_search(query, &limits);
            Ok(())
        })?;
    }

    if meds.is_empty() {
        println!("No medications found.");
        return Ok(());
    }

    let prefs = Preferences::load(&config.preferences_path())?;
    for med in meds {
        let star = if prefs.is_favorite(&med.id) { "★" } else { " " };
        let alert = if med.is_high_alert() { " [HIGH ALERT]" } else { "" };
        println!(
            "{} {:<14} {} ({}){}",
            star, med.id, med.name, med.category, alert
        );
    }

    Ok(())
}

fn cmd_show(catalog: &Catalog, config: &Config, medication_id: &str, weight: Option<f64>) -> Result<()> {
    let med = lookup(catalog, medication_id)?;

    let limits = config.recents.clone();
    let prefs = Preferences::update(&config.preferences_path(), |prefs| {
        prefs.add_recent_medication(&med.id, &limits);
        Ok(())
    })?;

    let star = if prefs.is_favorite(&med.id) { " ★" } else { "" };
    println!("\n{}{}", med.name, star);
    if let Some(generic) = &med.generic_name {
        println!("  Generic: {}", generic);
    }
    match &med.subcategory {
        Some(sub) => println!("  Category: {} / {}", med.category, sub),
        None => println!("  Category: {}", med.category),
    }
    println!("\n  {}", med.description);

    for alert in &med.alerts {
        println!("\n  [{}] {}", alert.level, alert.text);
    }

    print_list("Indications", &med.indications);
    print_list("Contraindications", &med.contraindications);

    println!("\n  Dosage:");
    for dosage in &med.dosages {
        let marker = if dosage.rule.as_ref().is_some_and(DosingRule::is_weight_based) {
            " (weight-based)"
        } else {
            ""
        };
        println!("    - {}{}: {}", dosage.population, marker, dosage.details);
    }

    println!("\n  Routes: {}", med.administration.routes.join(", "));
    println!("  Notes: {}", med.administration.notes);
    print_list("Monitoring", &med.administration.monitoring);
    print_list("Concentrations", &med.concentrations);
    print_list("Algorithms", &med.algorithms);
    print_list("Look-alike/sound-alike", &med.look_alike_sound_alike);
    print_list("Interactions", &med.interactions);

    if let Some(onset) = &med.onset_duration {
        println!("\n  Onset: {}  Duration: {}", onset.onset, onset.duration);
    }
    if let Some(category) = &med.pregnancy_category {
        println!("  Pregnancy category: {:?}", category);
    }
    if let Some(reversal) = &med.reversal {
        println!("  Reversal: {}", reversal);
    }

    if let Some(weight) = weight {
        println!();
        print_calculations(med, weight);
    }

    println!();
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n  {}:", label);
    for item in items {
        println!("    - {}", item);
    }
}

fn print_calculations(med: &Medication, weight_kg: f64) {
    let results = calculate_for_medication(med, weight_kg);
    if results.is_empty() {
        println!("  {}: {}", med.name, DoseError::UnsupportedRule.user_message());
        return;
    }

    println!("  Doses for {} kg:", weight_kg);
    for result in results {
        match &result.outcome {
            Ok(calc) => {
                match &calc.volume_string {
                    Some(volume) => println!(
                        "    {}: {} ({})",
                        result.dosage.population, calc.dose_string, volume
                    ),
                    None => println!("    {}: {}", result.dosage.population, calc.dose_string),
                }
                for warning in &calc.warnings {
                    println!("      ⚠ {}", warning);
                }
            }
            Err(e) => println!("    {}: {}", result.dosage.population, e.user_message()),
        }
    }
}

fn cmd_calc(catalog: &Catalog, medication_id: &str, weight: f64, json: bool) -> Result<()> {
    let med = lookup(catalog, medication_id)?;

    if let Err(e) = PatientWeight::new(weight) {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }

    if !json {
        println!("\n{}", med.name);
        print_calculations(med, weight);
        println!();
        return Ok(());
    }

    let results: Vec<_> = calculate_for_medication(med, weight)
        .into_iter()
        .map(|result| match result.outcome {
            Ok(calc) => serde_json::json!({
                "population": result.dosage.population,
                "details": result.dosage.details,
                "calculation": calc,
            }),
            Err(e) => serde_json::json!({
                "population": result.dosage.population,
                "details": result.dosage.details,
                "error": e.user_message(),
            }),
        })
        .collect();

    let output = serde_json::json!({
        "medication_id": med.id,
        "medication": med.name,
        "weight_kg": weight,
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_protocols(catalog: &Catalog) -> Result<()> {
    for info in catalog.protocol_infos() {
        println!("{:<22} [{}] {}", info.id, info.category, info.title);
        println!("{:<22} {}", "", info.description);
    }
    Ok(())
}

fn cmd_fav(catalog: &Catalog, config: &Config, medication_id: &str) -> Result<()> {
    let med = lookup(catalog, medication_id)?;

    let prefs = Preferences::update(&config.preferences_path(), |prefs| {
        prefs.toggle_favorite(&med.id);
        Ok(())
    })?;

    if prefs.is_favorite(&med.id) {
        println!("★ Added {} to favorites", med.name);
    } else {
        println!("Removed {} from favorites", med.name);
    }
    Ok(())
}

fn cmd_favs(catalog: &Catalog, config: &Config, clear_recents: bool) -> Result<()> {
    let path = config.preferences_path();

    if clear_recents {
        Preferences::update(&path, |prefs| {
            prefs.clear_recent_searches();
            prefs.clear_recent_medications();
            Ok(())
        })?;
        println!("✓ Cleared recent searches and medications");
        return Ok(());
    }

    let prefs = Preferences::load(&path)?;
    print_ids(catalog, "Favorites", &prefs.favorites);
    print_ids(catalog, "Recently viewed", &prefs.recent_medications);

    println!("Recent searches:");
    if prefs.recent_searches.is_empty() {
        println!("  (none)");
    }
    for term in &prefs.recent_searches {
        println!("  {}", term);
    }
    Ok(())
}

fn print_ids(catalog: &Catalog, label: &str, ids: &[String]) {
    println!("{}:", label);
    if ids.is_empty() {
        println!("  (none)");
    }
    for id in ids {
        match catalog.get(id) {
            Some(med) => println!("  {:<14} {}", id, med.name),
            None => println!("  {:<14} (no longer in catalog)", id),
        }
    }
}

// ============================================================================
// Protocol runner
// ============================================================================

/// Where runner commands come from
enum Input {
    Script(VecDeque<String>),
    Stdin,
}

impl Input {
    fn is_interactive(&self) -> bool {
        matches!(self, Input::Stdin)
    }

    fn next(&mut self) -> Result<Option<String>> {
        match self {
            Input::Script(commands) => Ok(commands.pop_front()),
            Input::Stdin => {
                print!("> ");
                io::stdout().flush()?;
                let mut line = String::new();
                if io::stdin().read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                Ok(Some(line))
            }
        }
    }
}

fn cmd_run(
    catalog: &Catalog,
    config: &Config,
    protocol_id: &str,
    script: Option<Vec<String>>,
    simulated_clock: bool,
    json: bool,
) -> Result<()> {
    let protocol = catalog
        .protocol(protocol_id)
        .ok_or_else(|| Error::Other(format!("Unknown protocol: {}", protocol_id)))?;

    let mut input = match script {
        Some(commands) => Input::Script(commands.into()),
        None => Input::Stdin,
    };
    let ticker = Ticker::new(config.protocol.tick_interval());
    let threshold = config.protocol.urgent_threshold_seconds;

    println!("{} [{}]", protocol.info.title, protocol.info.category);

    if simulated_clock {
        let mut session = ProtocolSession::with_clock(&protocol.graph, ManualClock::default())
            .with_urgent_threshold(threshold);
        drive_protocol(&mut session, catalog, &mut input, ticker)?;
        finish_run(&session, json)
    } else {
        let mut session = ProtocolSession::new(&protocol.graph).with_urgent_threshold(threshold);
        drive_protocol(&mut session, catalog, &mut input, ticker)?;
        finish_run(&session, json)
    }
}

fn drive_protocol<C: Clock>(
    session: &mut ProtocolSession<'_, C>,
    catalog: &Catalog,
    input: &mut Input,
    ticker: Ticker,
) -> Result<()> {
    let live = input.is_interactive();
    let mut rendered: Option<usize> = None;

    loop {
        if let Some(Transition::Moved { from, .. }) = session.tick() {
            println!("\n⏱ Timer for '{}' finished", from);
        }

        // Render once per history entry so repeated visits show again
        if rendered != Some(session.history().len()) {
            rendered = Some(session.history().len());
            let node = session.current_node();
            start_node_timer(session)?;
            render_node(session, node, catalog);
        }

        let Some(line) = input.next()? else {
            break;
        };

        let command = line.trim();
        let outcome = match command {
            "" | "n" | "next" => session.advance_default().map(|t| {
                if !t.moved() && !session.current_node().is_terminal() {
                    println!("  Choose an option by number");
                }
            }),
            "w" | "wait" => {
                wait_for_timers(session, ticker, live);
                Ok(())
            }
            "p" | "pause" => {
                let id = session.current_node_id().to_string();
                session.pause_timer(&id)
            }
            "r" | "resume" => {
                let id = session.current_node_id().to_string();
                session.resume_timer(&id)
            }
            "reset" => {
                session.reset();
                rendered = None;
                Ok(())
            }
            "h" | "history" => {
                print_history(session);
                Ok(())
            }
            "q" | "quit" => break,
            _ => {
                if let Ok(n) = command.parse::<usize>() {
                    session.choose(n.saturating_sub(1)).map(|_| ())
                } else if let Some(target) = command.strip_prefix("goto ") {
                    session.advance(target.trim()).map(|_| ())
                } else {
                    print_runner_help();
                    Ok(())
                }
            }
        };

        if let Err(e) = outcome {
            println!("  ! {}", e);
        }
    }

    Ok(())
}

/// Start the timer of a timer node on arrival unless one is already counting
fn start_node_timer<C: Clock>(session: &mut ProtocolSession<'_, C>) -> Result<()> {
    let id = session.current_node_id().to_string();
    let fresh = session.timer(&id).map_or(true, |t| t.auto_advanced);
    if fresh {
        session.start_current_timer()?;
    }
    Ok(())
}

fn wait_for_timers<C: Clock>(session: &mut ProtocolSession<'_, C>, ticker: Ticker, live: bool) {
    if !session.has_active_countdown() {
        println!("  No running timer");
        return;
    }

    let ticks = ticker.drive(session, |s, transition| {
        if live {
            if let Some(status) = s.timer_statuses().iter().find(|t| t.running) {
                let marker = if status.is_urgent { "!" } else { " " };
                print!("\r  {} {} {}   ", marker, status.title, status.display);
                let _ = io::stdout().flush();
            }
        }
        transition.is_none()
    });

    if live {
        println!();
    }
    tracing::debug!("Waited {} ticks", ticks);
}

fn render_node<C: Clock>(session: &ProtocolSession<'_, C>, node: &ProtocolNode, catalog: &Catalog) {
    let kind = match &node.kind {
        NodeKind::Start { .. } => "START",
        NodeKind::Action { .. } => "ACTION",
        NodeKind::Medication { .. } => "MEDICATION",
        NodeKind::Decision { .. } => "DECISION",
        NodeKind::Timer { .. } => "TIMER",
        NodeKind::End => "END",
    };

    println!("\n[{}] {}", kind, node.title);
    println!("  {}", node.content);
    for note in &node.clinical_notes {
        println!("  • {}", note);
    }

    match &node.kind {
        NodeKind::Medication { medication_id, .. } => match catalog.get(medication_id) {
            Some(med) => println!(
                "  Medication: {} (medrescue calc {} --weight <kg>)",
                med.name, med.id
            ),
            None => println!("  Medication: {}", medication_id),
        },
        NodeKind::Decision { options } => {
            for (i, option) in options.iter().enumerate() {
                println!("  {}) {}", i + 1, option.label);
            }
        }
        NodeKind::Timer { .. } => {
            if let Some(status) = session
                .timer_statuses()
                .into_iter()
                .find(|t| t.node_id == node.id)
            {
                println!("  Timer: {} ('w' to wait, 'p' to pause)", status.display);
            }
        }
        NodeKind::End => println!("  Protocol complete ('reset' to start over, 'q' to quit)"),
        NodeKind::Start { .. } | NodeKind::Action { .. } => {}
    }
}

fn print_history<C: Clock>(session: &ProtocolSession<'_, C>) {
    println!("History:");
    for entry in session.history() {
        let title = session
            .graph()
            .get(&entry.node_id)
            .map(|n| n.title.as_str())
            .unwrap_or("");
        println!(
            "  {} {:<24} {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.node_id,
            title
        );
    }
}

fn print_runner_help() {
    println!("  Commands: Enter/n next, <number> choose, w wait, p pause, r resume,");
    println!("            goto <node>, h history, reset, q quit");
}

fn finish_run<C: Clock>(session: &ProtocolSession<'_, C>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&session.view())?);
        return Ok(());
    }

    println!();
    print_history(session);
    Ok(())
}

