use std::{
    error::Error,
    sync::{Mutex, PoisonError},
};

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use log::{error, info};

use super::{
    conversation::{Conversations, Step},
    models::{Args, Config},
    user_store::UserStore,
};

pub const SAVED_MESSAGE: &str = "Данные сохранены! Выберите действие:";
pub const TRY_AGAIN_MESSAGE: &str = "Не удалось сохранить данные, попробуйте ещё раз.";
pub const MENU_BUTTONS: [&str; 2] = ["Дневник", "Оценки"];

/// Text of a reply and whether the one-time menu keyboard goes with it.
#[derive(Debug, PartialEq, Eq)]
pub struct Answer {
    pub text: &'static str,
    pub show_menu: bool,
}

impl Answer {
    fn text(text: &'static str) -> Self {
        Answer {
            text,
            show_menu: false,
        }
    }
}

pub fn get_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    info!(
        "Reading config from {}",
        std::path::absolute(&args.config_json_path)?.display()
    );
    let config: Config = Figment::new()
        .merge(Json::file(&args.config_json_path))
        .merge(Env::prefixed("INTAKE_"))
        .extract()?;
    Ok(config)
}

/// Moves the chat one step through the prompt sequence and saves the
/// registration once the url arrives. A failed save is logged, the user is
/// asked to send the url again. The lock is released while saving, so a
/// message of the same chat arriving meanwhile starts a new draft, which a
/// failed save then leaves alone.
pub async fn handle_message<US: UserStore>(
    store: &US,
    conversations: &Mutex<Conversations>,
    chat_id: i64,
    message: &str,
) -> Answer {
    let step = {
        let mut conversations = conversations.lock().unwrap_or_else(PoisonError::into_inner);
        if message.starts_with("/start") {
            return Answer::text(conversations.start(chat_id));
        }
        conversations.handle_user_data(chat_id, message)
    };

    match step {
        Step::Ask(prompt) => Answer::text(prompt),
        Step::Completed(registration) => match store.save_user_data(&registration).await {
            Ok(()) => {
                info!("Saved user {} from chat {}", registration.login, chat_id);
                Answer {
                    text: SAVED_MESSAGE,
                    show_menu: true,
                }
            }
            Err(err) => {
                error!("Cannot save user from chat {}: {}", chat_id, err);
                conversations
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .restore(chat_id, registration);
                Answer::text(TRY_AGAIN_MESSAGE)
            }
        },
    }
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
