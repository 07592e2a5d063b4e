use std::error::Error;

use log::info;
use tokio::{fs::File, io::AsyncWriteExt};

use super::{
    client::NetSchoolApi,
    helpers::requests_timeout,
    models::{Command, Config},
};

/// Logs in with the configured credentials, runs one diary command and
/// returns what should be shown to the user.
pub async fn run(command: &Command, config: Config) -> Result<String, Box<dyn Error>> {
    let requests_timeout = requests_timeout(config.requests_timeout)?;
    let mut api = NetSchoolApi::new(&config.url, requests_timeout)?;
    api.login(&config.login, &config.password, config.school, None)
        .await?;

    let output = execute(&mut api, command).await;
    api.full_logout(None).await?;
    output
}

pub async fn execute(api: &mut NetSchoolApi, command: &Command) -> Result<String, Box<dyn Error>> {
    let output = match command {
        Command::Diary { start, end } => {
            serde_json::to_string_pretty(&api.diary(*start, *end, None).await?)?
        }
        Command::Overdue { start, end } => {
            serde_json::to_string_pretty(&api.overdue(*start, *end, None).await?)?
        }
        Command::Announcements { take } => {
            serde_json::to_string_pretty(&api.announcements(Some(*take), None).await?)?
        }
        Command::Attachments { assignment_id } => {
            serde_json::to_string_pretty(&api.attachments(*assignment_id, None).await?)?
        }
        Command::School => serde_json::to_string_pretty(&api.school(None).await?)?,
        Command::Schools { name: Some(name) } => {
            serde_json::to_string_pretty(&api.search_schools(name, None).await?)?
        }
        Command::Schools { name: None } => serde_json::to_string_pretty(&api.schools(None).await?)?,
        Command::DownloadAttachment {
            attachment_id,
            output,
        } => {
            let mut file = File::create(output).await?;
            api.download_attachment(*attachment_id, &mut file, None)
                .await?;
            file.flush().await?;
            format!("Attachment {} saved to {}", attachment_id, output.display())
        }
        Command::DownloadProfilePicture { user_id, output } => {
            let mut file = File::create(output).await?;
            api.download_profile_picture(*user_id, &mut file, None)
                .await?;
            file.flush().await?;
            format!("Profile picture of {} saved to {}", user_id, output.display())
        }
    };
    info!("Command {:?} done", command);
    Ok(output)
}
