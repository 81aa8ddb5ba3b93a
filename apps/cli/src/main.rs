use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use bookcast_core::{
    BookStore, ImageMatchOutcome, LessonPipeline, MediaStack, Provider, RemotionRenderer,
    RenderedLesson, ScriptMode, Settings, completion_client, extractor_for,
    format_outline_readable, format_plan_readable, format_quiz_readable, ingest_book, media_tool,
    speech_client,
};

const LOG_ENV: &str = "BOOKCAST_LOG";

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, ValueEnum)]
enum CliProvider {
    Openai,
    Anthropic,
    Gemini,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Openai => Provider::Openai,
            CliProvider::Anthropic => Provider::Anthropic,
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum CliScriptMode {
    Test,
    Prod,
}

impl From<CliScriptMode> for ScriptMode {
    fn from(cli: CliScriptMode) -> Self {
        match cli {
            CliScriptMode::Test => ScriptMode::Test,
            CliScriptMode::Prod => ScriptMode::Prod,
        }
    }
}

#[derive(Parser)]
#[command(name = "bookcast")]
#[command(about = "Turn a technical book into a narrated multi-lesson video course")]
struct Cli {
    /// TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// AI provider for text generation (overrides the settings file)
    #[arg(short, long, global = true)]
    provider: Option<CliProvider>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract a book (PDF or plain text) and print its new book id
    Ingest {
        file: PathBuf,
        /// JSON list of image records extracted from the book
        #[arg(long)]
        images: Option<PathBuf>,
    },
    /// Generate the course outline for an ingested book
    Outline { book_id: String },
    /// Write the narration script for one lesson
    Script {
        book_id: String,
        lesson_index: usize,
        #[arg(short, long)]
        mode: Option<CliScriptMode>,
        /// Regenerate even if a script already exists
        #[arg(short, long)]
        force: bool,
    },
    /// Generate a multiple-choice quiz for one lesson
    Quiz { book_id: String, lesson_index: usize },
    /// Assemble and print a lesson plan without producing audio
    Plan { book_id: String, lesson_index: usize },
    /// Voice and render one lesson, or every lesson with --all
    Render {
        book_id: String,
        #[arg(required_unless_present = "all")]
        lesson_index: Option<usize>,
        #[arg(long, conflicts_with = "lesson_index")]
        all: bool,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .expect("valid spinner template"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn done(pb: &ProgressBar, msg: String, started: Instant) {
    pb.finish_with_message(format!(
        "{} {} {}",
        style("✓").green().bold(),
        msg,
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    ));
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(provider) = cli.provider.clone() {
        let provider: Provider = provider.into();
        if provider != settings.llm.provider {
            // a configured model belongs to the configured provider
            settings.llm.model = None;
            settings.llm.api_key = None;
        }
        settings.llm.provider = provider;
    }
    Ok(settings)
}

fn pipeline(settings: &Settings, store: BookStore) -> Result<LessonPipeline> {
    let llm = completion_client(&settings.llm)?;
    Ok(LessonPipeline::new(store, llm, settings))
}

fn media_stack(settings: &Settings) -> Result<MediaStack> {
    Ok(MediaStack {
        tts: speech_client(&settings.tts)?,
        media: media_tool(settings.media.backend),
        renderer: Box::new(RemotionRenderer::new(&settings.render)),
        public_dir: settings.render.public_dir(),
    })
}

fn print_rendered(lesson: &RenderedLesson) {
    println!(
        "  {} lesson {} → {} {}",
        style("•").cyan(),
        lesson.lesson_index,
        style(lesson.video_path.display()).cyan(),
        style(format!(
            "({} slides, {}s, {})",
            lesson.plan.slides.len(),
            lesson.plan.total_duration_sec,
            lesson.source
        ))
        .dim()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let store = BookStore::new(settings.data_dir());

    println!(
        "\n{}  {}\n",
        style("bookcast").cyan().bold(),
        style("Book to Video Course").dim()
    );

    let total_start = Instant::now();

    match cli.command {
        Command::Ingest { file, images } => {
            let started = Instant::now();
            let spinner = create_spinner("Extracting book text...");
            let extractor = extractor_for(&file);
            let book = ingest_book(&store, extractor.as_ref(), &file, images.as_deref()).await?;
            done(
                &spinner,
                format!("Ingested {} chars, {} images", book.chars, book.images),
                started,
            );
            println!("\n{} {}", style("Book id:").dim(), style(&book.book_id).cyan().bold());
        }

        Command::Outline { book_id } => {
            let pipeline = pipeline(&settings, store)?;
            let started = Instant::now();
            let spinner = create_spinner(&format!(
                "Designing course with {}...",
                settings.llm.provider.name()
            ));
            let outline = pipeline.create_outline(&book_id).await?;
            done(
                &spinner,
                format!("Outline ready: {} lessons", outline.lessons.len()),
                started,
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_outline_readable(&outline));
        }

        Command::Script {
            book_id,
            lesson_index,
            mode,
            force,
        } => {
            let pipeline = pipeline(&settings, store)?;
            let started = Instant::now();
            let mode = mode.map(ScriptMode::from);
            let spinner = create_spinner(&format!(
                "Writing {} script for lesson {}...",
                mode.unwrap_or(settings.script.mode),
                lesson_index
            ));
            let script = pipeline
                .write_script(&book_id, lesson_index, mode, force)
                .await?;
            let note = if script.reused { " (cached)" } else { "" };
            done(
                &spinner,
                format!(
                    "Script for {}: {} words{}",
                    script.lesson_id,
                    script.script.split_whitespace().count(),
                    note
                ),
                started,
            );
            println!(
                "\n{} {}\n",
                style("Saved:").dim(),
                style(script.path.display()).cyan()
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", script.script);
        }

        Command::Quiz {
            book_id,
            lesson_index,
        } => {
            let pipeline = pipeline(&settings, store)?;
            let started = Instant::now();
            let spinner = create_spinner(&format!("Writing quiz for lesson {}...", lesson_index));
            let quiz = pipeline.write_quiz(&book_id, lesson_index).await?;
            done(&spinner, format!("Quiz: {} questions", quiz.len()), started);
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_quiz_readable(&quiz));
        }

        Command::Plan {
            book_id,
            lesson_index,
        } => {
            let pipeline = pipeline(&settings, store)?;
            let started = Instant::now();
            let spinner = create_spinner(&format!("Planning lesson {}...", lesson_index));
            let planned = pipeline.plan_lesson(&book_id, lesson_index).await;
            done(
                &spinner,
                format!(
                    "Plan from {}: {} slides",
                    planned.source,
                    planned.plan.slides.len()
                ),
                started,
            );
            match &planned.images {
                ImageMatchOutcome::Skipped => {}
                ImageMatchOutcome::Matched { assignments } => println!(
                    "{} Images matched: {}",
                    style("✓").green().bold(),
                    assignments.len()
                ),
                ImageMatchOutcome::Failed { reason } => println!(
                    "{} Image matching skipped: {}",
                    style("!").yellow().bold(),
                    style(reason).dim()
                ),
            }
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_plan_readable(&planned.plan));
        }

        Command::Render {
            book_id,
            lesson_index,
            all,
        } => {
            let pipeline = pipeline(&settings, store)?;
            let stack = media_stack(&settings)?;

            let rendered = if all {
                let spinner = create_spinner("Rendering every lesson...");
                let started = Instant::now();
                let lessons = pipeline.produce_course(&book_id, &stack).await?;
                done(&spinner, format!("Rendered {} lessons", lessons.len()), started);
                lessons
            } else {
                let Some(lesson_index) = lesson_index else {
                    bail!("pass a lesson index or --all");
                };
                let spinner = create_spinner(&format!("Rendering lesson {}...", lesson_index));
                let started = Instant::now();
                let lesson = pipeline
                    .produce_lesson_video(&book_id, lesson_index, &stack)
                    .await?;
                done(&spinner, format!("Rendered lesson {}", lesson_index), started);
                vec![lesson]
            };

            println!("{}", style("─".repeat(60)).dim());
            for lesson in &rendered {
                print_rendered(lesson);
            }
        }
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}
