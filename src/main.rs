use artwork_assistant::config::AppConfig;
use artwork_assistant::llm_api::openai::client::OpenAiClient;
use artwork_assistant::logger::init_logger;
use artwork_assistant::recommendation::ArtworkAssistant;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    //*
    //* Load configuration
    //*
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    //*
    //* Initialize logger
    //*
    if let Err(e) = init_logger(config.log.clone()) {
        eprintln!("Failed to initialize logger: {}", e);
        std::process::exit(1);
    }
    info!(model = %config.model, base_url = %config.base_url, "Configuration loaded");

    //*
    //* Build chat completion client
    //*
    let client = match OpenAiClient::new_with_config(
        config.api_key.clone(),
        config.base_url.clone(),
        config.client_config(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create chat client: {}", e);
            std::process::exit(1);
        }
    };
    let assistant = ArtworkAssistant::new(client, config.model.clone());

    //*
    //* Request recommendation
    //*
    let result = match config.art_api_url.as_deref() {
        Some(art_api_url) => match config.art_fetcher() {
            Ok(fetcher) => {
                info!(art_api_url = %art_api_url, "Running recommendation with tool round trip");
                assistant
                    .recommend_with_tool(&fetcher, art_api_url, &config.art_query_param)
                    .await
            }
            Err(e) => {
                error!("Failed to create artwork fetcher: {}", e);
                std::process::exit(1);
            }
        },
        None => assistant.request_recommendation().await,
    };

    match result {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Recommendation failed: {}", e);
            std::process::exit(1);
        }
    }
}
