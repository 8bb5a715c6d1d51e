use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

use command_resolver::{
    training_corpus, CascadeOrder, IntentClassifier, ResolutionCascade, ResolutionOutcome,
    TextClassifier,
};
use serial_link::{discovery, LinkSettings, MockLink, SerialLink};
use voice_robot::{HistoryRecord, RobotConfig, RobotSession};

#[derive(Parser, Debug)]
#[command(
    name = "robot",
    version,
    about = "Voice-commanded robot CLI",
    disable_help_subcommand = true
)]
struct Cli {
    /// Configuration file; created with defaults when missing
    #[arg(long, global = true, default_value = "robot_config.json")]
    config: PathBuf,

    /// Link backend
    #[arg(long, value_enum, global = true, default_value_t = Backend::default())]
    backend: Backend,

    /// Serial endpoint, overrides the config file
    #[arg(long, global = true)]
    port: Option<String>,

    /// Classifier confidence threshold, overrides the config file
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Stage tried first, overrides the config file
    #[arg(long, value_enum, global = true)]
    order: Option<Order>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Serial,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "serial") {
            Backend::Serial
        } else {
            Backend::Mock
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Order {
    ClassifierFirst,
    KeywordFirst,
}

impl From<Order> for CascadeOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::ClassifierFirst => CascadeOrder::ClassifierFirst,
            Order::KeywordFirst => CascadeOrder::KeywordFirst,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve an utterance to a command without sending it
    Resolve {
        text: Vec<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the classifier's top intents for an utterance
    Predict {
        text: Vec<String>,
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
    /// Retrain the classifier, report holdout accuracy and save the model
    Train {
        /// Hold out every N-th corpus phrase for evaluation
        #[arg(long, default_value_t = 5)]
        holdout_every: usize,
        /// Model output path; defaults to the configured model path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List serial ports and flag likely Arduino boards
    Ports,
    /// Send a raw protocol command, e.g. `MF:90:1`
    Send { command: String },
    /// Resolve, send and record one utterance
    Say { text: Vec<String> },
    /// Interactive loop; `quit`, `exit` or `q` to leave
    Repl,
    /// Connect as configured and print the link status
    Status {
        /// Also print the session metrics
        #[arg(long)]
        metrics: bool,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let mut config = RobotConfig::load(&cli.config)?;
    if let Some(port) = cli.port.clone() {
        config.port = Some(port);
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(order) = cli.order {
        config.cascade_order = order.into();
    }
    config.validate()?;

    match cli.command {
        Commands::Resolve { text, json } => resolve(&config, &text.join(" "), json),
        Commands::Predict { text, top } => predict(&config, &text.join(" "), top),
        Commands::Train { holdout_every, out } => train(&config, holdout_every, out),
        command => match cli.backend {
            Backend::Mock => {
                run_link::<MockLink>(command, &config, LinkSettings::immediate(config.baud_rate))
            }
            #[cfg(feature = "serial")]
            Backend::Serial => run_link::<serial_link::SerialPortLink>(
                command,
                &config,
                config.link_settings(),
            ),
            #[cfg(not(feature = "serial"))]
            Backend::Serial => bail!("robot was built without the `serial` feature"),
        },
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn cascade(config: &RobotConfig) -> ResolutionCascade {
    ResolutionCascade::initialize(
        config.cascade_config(),
        config.classifier_config(),
        config.model_path.as_deref(),
        config.save_model,
    )
}

fn resolve(config: &RobotConfig, text: &str, json: bool) -> Result<()> {
    let outcome = cascade(config).resolve(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    match outcome {
        ResolutionOutcome::Resolved(r) => match r.prediction {
            Some(p) => println!("{}\t{}\t{} ({:.3})", r.command, r.stage, p.intent, p.confidence),
            None => println!("{}\t{}", r.command, r.stage),
        },
        ResolutionOutcome::Unresolved => println!("unresolved"),
    }
    Ok(())
}

fn predict(config: &RobotConfig, text: &str, top: usize) -> Result<()> {
    let classifier = TextClassifier::new(config.classifier_config()).ensure_ready(
        &training_corpus(),
        config.model_path.as_deref(),
        config.save_model,
    )?;
    for p in classifier.top_k(text, top)? {
        println!("{}\t{:.4}", p.intent, p.confidence);
    }
    Ok(())
}

fn train(config: &RobotConfig, holdout_every: usize, out: Option<PathBuf>) -> Result<()> {
    let corpus = training_corpus();
    let report =
        TextClassifier::evaluate_holdout(config.classifier_config(), &corpus, holdout_every)?;
    println!(
        "holdout: {}/{} correct ({:.1}%), trained on {}",
        report.correct,
        report.test_size,
        report.accuracy * 100.0,
        report.train_size
    );

    let mut classifier = TextClassifier::new(config.classifier_config());
    classifier.train(&corpus)?;
    println!(
        "trained on {} phrases, {} features",
        corpus.len(),
        classifier.vocabulary_size()
    );

    let path = out
        .or_else(|| config.model_path.clone())
        .ok_or_else(|| anyhow!("no model path configured; pass --out"))?;
    classifier
        .save(&path)
        .with_context(|| format!("saving model to {}", path.display()))?;
    info!(path = %path.display(), "model saved");
    println!("saved {}", path.display());
    Ok(())
}

fn run_link<P: SerialLink>(
    command: Commands,
    config: &RobotConfig,
    settings: LinkSettings,
) -> Result<()> {
    if let Commands::Ports = command {
        return list_ports::<P>();
    }

    let session = RobotSession::<P>::from_config_with_link(config, settings)?;
    if !session.connect_configured(config) {
        info!("running in simulation mode");
    }

    match command {
        Commands::Send { command } => {
            let ack = session.link().send(&command);
            println!("{ack}");
            if ack.is_failure() {
                bail!("send failed: {:?}", ack);
            }
        }
        Commands::Say { text } => print_record(&session.handle_utterance(&text.join(" "))),
        Commands::Repl => repl(&session)?,
        Commands::Status { metrics } => {
            println!("{}", serde_json::to_string_pretty(&session.link_status())?);
            if metrics {
                print!("{}", session.metrics_text());
            }
        }
        other => bail!("unexpected command {other:?}"),
    }
    session.close();
    Ok(())
}

fn list_ports<P: SerialLink>() -> Result<()> {
    let ports = P::list()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in &ports {
        let usb = port.usb.map(|id| id.to_string()).unwrap_or_default();
        let marker = if discovery::is_arduino(port) {
            "\tarduino"
        } else {
            ""
        };
        println!(
            "{}\t{}\t{}\t{}{}",
            port.name,
            port.driver,
            usb,
            port.product.as_deref().unwrap_or(""),
            marker
        );
    }
    Ok(())
}

fn print_record(record: &HistoryRecord) {
    println!(
        "[{}] {} -> {} : {} ({})",
        record.display_time(),
        record.utterance,
        record.command.as_deref().unwrap_or("-"),
        record.response,
        record.status.as_str()
    );
}

fn repl<P: SerialLink>(session: &RobotSession<P>) -> Result<()> {
    println!("type a command; `history`, `status`, `reconnect`, or `quit`");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        stdout.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        match line.trim() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "history" => {
                for record in session.history() {
                    print_record(&record);
                }
            }
            "status" => println!("{}", serde_json::to_string(&session.link_status())?),
            "reconnect" => {
                let ok = session.reconnect();
                println!("{}", if ok { "connected" } else { "reconnect failed" });
            }
            text => print_record(&session.handle_utterance(text)),
        }
    }
    Ok(())
}
