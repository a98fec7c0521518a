//! pilot - search-augmented chat assistant CLI

mod commands;
mod config;
mod utils;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use pilot_agent::chats::{export_transcript, import_legacy};
use pilot_agent::notify::compose_email;
use pilot_agent::{
    Assistant, AssistantConfig, ChatIndex, FileTranscriptStore, LlmClassifier, LlmSynthesizer,
    RetryConfig, Searcher, SendGridNotifier, SessionId, TavilySearcher, Transcript, TurnEvent,
};
use pilot_ai::mail::SendGridClient;
use pilot_ai::providers::{LlmProvider, completions::CompletionsProvider};
use pilot_ai::search::TavilyClient;
use pilot_ai::{Model, Provider, models};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::commands::{ChatsCommand, CommandResult};

const DEFAULT_USER: &str = "default";

/// pilot - chat assistant with web search
#[derive(Parser, Debug)]
#[command(name = "pilot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: the provider's first registered model)
    #[arg(short, long)]
    model: Option<String>,

    /// Provider (mistral, openai, groq, custom)
    #[arg(short, long)]
    provider: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Identifier your chats are grouped under
    #[arg(short, long)]
    user: Option<String>,

    /// Resume a chat by number, id or id prefix
    #[arg(long)]
    chat: Option<String>,

    /// List saved chats
    #[arg(long)]
    chats: bool,

    /// Directory holding transcripts
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Email every reply to this address
    #[arg(long)]
    notify: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Stand-in used when no search key is configured. Every search takes the
/// no-results path.
struct SearchDisabled;

#[async_trait]
impl Searcher for SearchDisabled {
    async fn search(&self, _query: &str, _max_results: usize) -> pilot_ai::Result<Vec<String>> {
        Err(pilot_ai::Error::InvalidConfig(
            "web search is disabled (no Tavily API key)".to_string(),
        ))
    }
}

/// Everything the interactive shell mutates between turns
struct Shell {
    assistant: Assistant,
    provider: Arc<dyn LlmProvider>,
    model: Model,
    index: ChatIndex,
    current: SessionId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("pilot_ai=debug,pilot_agent=debug,pilot_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file
    let cfg = config::Config::load();

    let data_dir = args.data_dir.clone().unwrap_or_else(|| cfg.data_dir());
    let user = SessionId::parse(
        args.user
            .as_deref()
            .or(cfg.user_id.as_deref())
            .unwrap_or(DEFAULT_USER),
    )?;

    let store = Arc::new(FileTranscriptStore::new(&data_dir));
    let mut index = ChatIndex::load(&data_dir, &user).await?;
    match import_legacy(&data_dir, &mut index, store.as_ref()).await {
        Ok(0) => {}
        Ok(imported) => eprintln!("Imported {} chat(s) from older history.", imported),
        Err(e) => {
            tracing::warn!(error = %e, "legacy history import failed");
            eprintln!("Warning: could not import older chat history: {}", e);
        }
    }

    // List chats and exit
    if args.chats {
        println!("{}", ChatsCommand::list_text(&index, None));
        println!("Chats are stored in: {}", data_dir.display());
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let provider_name = args
        .provider
        .or(cfg.provider.clone())
        .unwrap_or_else(|| "mistral".to_string());
    let provider_kind = Provider::parse(&provider_name);

    let model_id = args.model.or(cfg.model.clone()).unwrap_or_else(|| {
        models::default_model_for(provider_kind)
            .unwrap_or(models::DEFAULT_MODEL)
            .to_string()
    });
    let model = models::resolve_model(provider_kind, &model_id, cfg.base_url.as_deref());
    if let Err(e) = models::validate_model(provider_kind, &model) {
        eprintln!("Error: {}", e);
        eprintln!();
        eprintln!(
            "Pick a model served by {} with --model, or set base_url in the config file.",
            provider_kind.name()
        );
        std::process::exit(1);
    }

    // Check for API key (config or env). Custom endpoints may not need one.
    let api_key = match cfg.get_api_key(&provider_name.to_lowercase()) {
        Some(key) => Some(key),
        None if provider_kind == Provider::Custom => Some(String::new()),
        None => None,
    };
    let Some(api_key) = api_key else {
        let api_key_var = provider_kind.api_key_env_var().unwrap_or("MISTRAL_API_KEY");
        eprintln!("Error: No API key found for {}", provider_kind.name());
        eprintln!();
        eprintln!("Set your API key with: export {}=your-key", api_key_var);
        eprintln!("Or add it to config file: pilot --init-config");
        std::process::exit(1);
    };

    let timeout = cfg.timeout();
    let provider: Arc<dyn LlmProvider> =
        Arc::new(CompletionsProvider::new(api_key).with_timeout(timeout)?);

    let searcher: Arc<dyn Searcher> = match cfg.get_api_key("tavily") {
        Some(key) => {
            let mut client = TavilyClient::new(key).with_timeout(timeout)?;
            if let Some(url) = cfg.search_base_url.as_deref() {
                client = client.with_base_url(url);
            }
            Arc::new(TavilySearcher::new(client))
        }
        None => {
            tracing::warn!("no Tavily API key, web search disabled");
            Arc::new(SearchDisabled)
        }
    };

    let assistant_config = AssistantConfig {
        call_timeout: timeout,
        retry: RetryConfig::default(),
        notify_to: args.notify.or(cfg.notify_to.clone()),
    };
    let mut assistant = Assistant::new(
        assistant_config,
        store,
        Arc::new(LlmClassifier::new(provider.clone(), model.clone())),
        searcher,
        Arc::new(LlmSynthesizer::new(provider.clone(), model.clone())),
    );

    match (cfg.get_api_key("sendgrid"), cfg.from_email()) {
        (Some(key), Some(from)) => {
            let mut client = SendGridClient::new(key, from).with_timeout(timeout)?;
            if let Some(url) = cfg.mail_base_url.as_deref() {
                client = client.with_base_url(url);
            }
            assistant = assistant.with_notifier(Arc::new(SendGridNotifier::new(client)));
        }
        _ => {
            if assistant.config().notify_to.is_some() {
                eprintln!(
                    "Warning: notifications need SENDGRID_API_KEY and FROM_EMAIL; replies will not be emailed."
                );
            }
        }
    }

    if args.verbose {
        spawn_event_printer(assistant.subscribe());
    }

    let current = pick_chat(&mut index, args.chat.as_deref())?;
    index.save().await?;

    let mut shell = Shell {
        assistant,
        provider,
        model,
        index,
        current,
    };

    // Non-interactive mode
    if let Some(command) = args.command {
        let result = run_command(&shell, &command).await;
        shell.assistant.wait_for_notifications().await;
        return result;
    }

    let result = run_interactive(&mut shell).await;
    shell.assistant.wait_for_notifications().await;
    result
}

/// Resolve `--chat`, or fall back to the newest chat, or start one
fn pick_chat(index: &mut ChatIndex, requested: Option<&str>) -> anyhow::Result<SessionId> {
    if let Some(key) = requested {
        if let Some(chat) = index.resolve(key) {
            return Ok(chat.id.clone());
        }
        let id = SessionId::parse(key)?;
        index.ensure(&id);
        return Ok(id);
    }

    if let Some(chat) = index.latest() {
        return Ok(chat.id.clone());
    }
    Ok(index.create(None).id.clone())
}

fn spawn_event_printer(mut receiver: broadcast::Receiver<TurnEvent>) {
    tokio::spawn(async move {
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                TurnEvent::RouteDecided { route, fallback } => {
                    if fallback {
                        eprintln!("[route: {} (classifier unavailable)]", route);
                    } else {
                        eprintln!("[route: {}]", route);
                    }
                }
                TurnEvent::SearchCompleted { snippets } => {
                    eprintln!("[search: {} snippet(s)]", snippets);
                }
                TurnEvent::TranscriptSaved { messages } => {
                    eprintln!("[saved: {} messages]", messages);
                }
                TurnEvent::NotificationQueued { recipient } => {
                    eprintln!("[email queued for {}]", recipient);
                }
                TurnEvent::NotificationSent { recipient } => {
                    eprintln!("[email sent to {}]", recipient);
                }
                TurnEvent::NotificationFailed { recipient, error } => {
                    eprintln!("[email to {} failed: {}]", recipient, error);
                }
                TurnEvent::TurnFailed { message } => {
                    eprintln!("[turn failed: {}]", message);
                }
                _ => {}
            }
        }
    });
}

async fn run_command(shell: &Shell, command: &str) -> anyhow::Result<()> {
    match shell.assistant.handle_turn(&shell.current, command).await {
        Ok(reply) => {
            println!("{}", reply);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            Err(e.into())
        }
    }
}

async fn run_interactive(shell: &mut Shell) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let title = shell
            .index
            .get(&shell.current)
            .map(|c| c.title.clone())
            .unwrap_or_default();
        eprintln!(
            "pilot ({}) chat: {} [{}]",
            shell.model.id,
            title,
            shell.current.short()
        );
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, &shell.index, &shell.current) {
            if matches!(result, CommandResult::Exit) {
                break;
            }
            if let Err(e) = apply_command(shell, result).await {
                eprintln!("Error: {}", e);
            }
            println!();
            continue;
        }

        match shell.assistant.handle_turn(&shell.current, input).await {
            Ok(reply) => println!("\n{}\n", reply),
            Err(e) => eprintln!("\n{}\n", e.user_message()),
        }
    }

    Ok(())
}

async fn apply_command(shell: &mut Shell, result: CommandResult) -> anyhow::Result<()> {
    match result {
        CommandResult::NewChat(title) => {
            let chat = shell.index.create(title.as_deref()).clone();
            shell.index.save().await?;
            shell.current = chat.id;
            println!("Started chat: {}", chat.title);
        }
        CommandResult::SwitchChat(id) => {
            let transcript = shell.assistant.store().load(&id).await?;
            shell.current = id;
            let title = shell
                .index
                .get(&shell.current)
                .map(|c| c.title.as_str())
                .unwrap_or("");
            println!("Switched to: {} ({} messages)", title, transcript.len());
            print_recent(&transcript, 2);
        }
        CommandResult::Rename(title) => {
            shell.index.rename(&shell.current, &title);
            shell.index.save().await?;
            println!("Renamed chat to: {}", title);
        }
        CommandResult::Clear => {
            shell
                .assistant
                .store()
                .save(&shell.current, &Transcript::new())
                .await?;
            println!("Cleared conversation.");
        }
        CommandResult::Delete => {
            shell.assistant.store().remove(&shell.current).await?;
            shell.index.remove(&shell.current);
            shell.current = pick_chat(&mut shell.index, None)?;
            shell.index.save().await?;
            let title = shell
                .index
                .get(&shell.current)
                .map(|c| c.title.as_str())
                .unwrap_or("");
            println!("Deleted chat. Now in: {}", title);
        }
        CommandResult::Export(path) => {
            let transcript = shell.assistant.store().load(&shell.current).await?;
            if transcript.is_empty() {
                println!("Nothing to export yet.");
            } else {
                export_transcript(&transcript, &path).await?;
                println!("Exported {} messages to {}", transcript.len(), path.display());
            }
        }
        CommandResult::Email(instruction) => {
            if !shell.assistant.has_notifier() {
                println!("Email is not configured. Set SENDGRID_API_KEY and FROM_EMAIL.");
                return Ok(());
            }
            let notification = compose_email(&shell.provider, &shell.model, &instruction).await?;
            let recipient = notification.recipient.clone();
            let subject = notification.subject.clone();
            shell.assistant.notify(notification);
            println!("Sending \"{}\" to {}", subject, recipient);
        }
        CommandResult::Message(msg) => println!("{}", msg),
        CommandResult::Unknown(cmd) => {
            println!("Unknown command: /{}", cmd);
            println!("Type /help for available commands.");
        }
        CommandResult::Exit => {}
    }
    Ok(())
}

fn print_recent(transcript: &Transcript, count: usize) {
    let messages = transcript.messages();
    let start = messages.len().saturating_sub(count);
    for message in &messages[start..] {
        if message.role == pilot_ai::Role::System {
            continue;
        }
        let preview = utils::truncate_chars(&message.content.replace('\n', " "), 100);
        println!("  [{}] {}", message.role.as_str(), preview);
    }
}
