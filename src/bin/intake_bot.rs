use netschool::intake::conversation::Conversations;
use netschool::intake::helpers::{get_config, handle_message, MENU_BUTTONS};
use netschool::intake::models::Args;
use netschool::intake::user_store::init_connection;

use std::{error::Error, sync::Arc, sync::Mutex};

use clap::Parser;
use log::info;
use sqlx::PgPool;
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
};

struct IntakeState {
    pool: PgPool,
    conversations: Mutex<Conversations>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    /* Setup logging */
    env_logger::builder()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    /* Get all the required resources */
    let args = Args::parse();
    let config = get_config(&args)?;
    let pool = init_connection(&config.database_url).await?;
    let state = Arc::new(IntakeState {
        pool: pool.clone(),
        conversations: Mutex::new(Conversations::default()),
    });
    let bot = Bot::new(config.telegram_token);

    info!("Intake bot started");
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let state = state.clone();
        async move {
            let Some(text) = msg.text() else {
                return Ok(());
            };
            let answer = handle_message(&state.pool, &state.conversations, msg.chat.id.0, text).await;

            let reply = bot.send_message(msg.chat.id, answer.text);
            if answer.show_menu {
                let menu = KeyboardMarkup::new(vec![MENU_BUTTONS
                    .iter()
                    .map(|button| KeyboardButton::new(*button))
                    .collect::<Vec<_>>()])
                .one_time_keyboard();
                reply.reply_markup(menu).await?;
            } else {
                reply.await?;
            }
            Ok(())
        }
    })
    .await;

    pool.close().await;
    info!("Intake bot stopped");
    Ok(())
}
