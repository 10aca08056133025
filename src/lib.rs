pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod markup;
pub mod models;
pub mod render;
pub mod stream;

use api::{ BackendClient, ImageApi, StaticCredentials };
use chat::ChatView;
use cli::Args;
use config::ClientConfig;
use config::notices::{ load_notices, Notices };
use log::{ info, warn };
use models::image::ImageRequest;
use render::{ render_entry, StreamPrinter };
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };

const QUIT_COMMAND: &str = "/quit";

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Client Configuration ---");
    info!("REST API URL: {}", args.django_api_url.as_deref().unwrap_or("(resolved)"));
    info!("Completion URL: {}", args.fastapi_url.as_deref().unwrap_or("(resolved)"));
    info!("Production: {}", args.production);
    info!("Signed In: {}", args.user_token.as_deref().map(|t| !t.is_empty()).unwrap_or(false));
    info!("Character: {:?}", args.character_id);
    info!("Temperature: {}", args.temperature);
    info!("Max Tokens: {}", args.max_tokens);
    info!("Notices Path: {}", args.notices_path.as_deref().unwrap_or("(built-in)"));
    info!("----------------------------");

    let config = ClientConfig::from_args(&args)?;
    let notices = match &args.notices_path {
        Some(path) => load_notices(path)?,
        None => Arc::new(Notices::default()),
    };
    let client = BackendClient::from_config(&config)?;
    let credentials = StaticCredentials::new(args.user_token.clone());

    if let Some(prompt) = &args.image_prompt {
        let request = ImageRequest {
            prompt: prompt.clone(),
            size: args.image_size,
            quality: args.image_quality,
            user_token: args.user_token.clone().unwrap_or_default(),
            save_to_db: true,
        };
        let image = client.generate_image(&request).await?;
        println!("{}", image.url);
        if !image.revised_prompt.is_empty() {
            println!("{}", image.revised_prompt);
        }
        return Ok(());
    }

    let mut view = ChatView::open(
        args.character_id,
        &client,
        &client,
        &credentials,
        notices,
        config.completion
    ).await?;
    chat_loop(&mut view, &client, &credentials, args.notices_path.as_deref()).await
}

async fn chat_loop(
    view: &mut ChatView,
    client: &BackendClient,
    credentials: &StaticCredentials,
    notices_path: Option<&str>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let speaker = view
        .character()
        .map(|c| c.character.name.clone())
        .unwrap_or_default();
    for entry in view.transcript().entries() {
        println!("{}", render_entry(entry, &speaker));
    }

    let mut events = view.subscribe();
    let mut printer = StreamPrinter::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim() == QUIT_COMMAND {
            break;
        }
        if let Some(path) = notices_path {
            if let Err(e) = view.refresh_notices(path) {
                warn!("Keeping current notices, reload of {} failed: {}", path, e);
            }
        }

        let sent = {
            let send = view.send_message(&line, client, credentials);
            tokio::pin!(send);
            loop {
                tokio::select! {
                    result = &mut send => break result,
                    Ok(event) = events.recv() => printer.handle(&event)?,
                }
            }
        };
        while let Ok(event) = events.try_recv() {
            printer.handle(&event)?;
        }

        match sent {
            Ok(outcome) => {
                for index in printer.take_finished() {
                    if let Some(entry) = view.transcript().get(index) {
                        println!("{}", render_entry(entry, &speaker));
                    }
                }
                if outcome.is_failure() {
                    warn!("Reply ended with {:?}", outcome);
                }
            }
            Err(rejected) => warn!("Message not sent: {}", rejected),
        }
    }

    view.abandon();
    Ok(())
}
