use std::collections::HashMap;

use super::models::Registration;

pub const LOGIN_PROMPT: &str = "Введите ваш логин:";
pub const PASSWORD_PROMPT: &str = "Введите ваш пароль:";
pub const SCHOOL_PROMPT: &str = "Введите вашу школу:";
pub const URL_PROMPT: &str = "Введите URL:";

/// What a chat has told so far.
#[derive(Debug, Clone, PartialEq)]
enum Draft {
    AwaitLogin,
    AwaitPassword {
        login: String,
    },
    AwaitSchool {
        login: String,
        password: String,
    },
    AwaitUrl {
        login: String,
        password: String,
        school: String,
    },
}

#[derive(Debug, PartialEq)]
pub enum Step {
    /// Reply with the prompt for the next field.
    Ask(&'static str),
    /// Every field is known, the draft is dropped.
    Completed(Registration),
}

/// Drafts of every chat that is in the middle of the prompt sequence.
#[derive(Debug, Default)]
pub struct Conversations {
    drafts: HashMap<i64, Draft>,
}

impl Conversations {
    /// Forgets whatever the chat has entered and asks for the login.
    pub fn start(&mut self, chat_id: i64) -> &'static str {
        self.drafts.insert(chat_id, Draft::AwaitLogin);
        LOGIN_PROMPT
    }

    /// Stores `message` as the next missing field of the chat's draft.
    /// Chats that never sent `/start` begin with the login.
    pub fn handle_user_data(&mut self, chat_id: i64, message: &str) -> Step {
        let message = message.to_owned();
        let draft = self.drafts.remove(&chat_id).unwrap_or(Draft::AwaitLogin);
        let (next, step) = match draft {
            Draft::AwaitLogin => (
                Draft::AwaitPassword { login: message },
                Step::Ask(PASSWORD_PROMPT),
            ),
            Draft::AwaitPassword { login } => (
                Draft::AwaitSchool {
                    login,
                    password: message,
                },
                Step::Ask(SCHOOL_PROMPT),
            ),
            Draft::AwaitSchool { login, password } => (
                Draft::AwaitUrl {
                    login,
                    password,
                    school: message,
                },
                Step::Ask(URL_PROMPT),
            ),
            Draft::AwaitUrl {
                login,
                password,
                school,
            } => {
                return Step::Completed(Registration {
                    login,
                    password,
                    school,
                    url: message,
                })
            }
        };
        self.drafts.insert(chat_id, next);
        step
    }

    /// Puts a registration that could not be saved back, waiting for the url again.
    /// A draft the chat started while the save was pending is kept instead.
    pub fn restore(&mut self, chat_id: i64, registration: Registration) {
        self.drafts
            .entry(chat_id)
            .or_insert_with(|| Draft::AwaitUrl {
                login: registration.login,
                password: registration.password,
                school: registration.school,
            });
    }

    pub fn in_progress(&self) -> usize {
        self.drafts.len()
    }
}
