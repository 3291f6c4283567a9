use async_trait::async_trait;
use serenity::all::{
    CommandInteraction, Context, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage, Message,
};
use serenity::http::HttpError;

use crate::models::SubmissionReport;

// Discord's JSON error code for "Missing Permissions".
const MISSING_PERMISSIONS: isize = 50013;

// Embed field values are capped at 1024 characters.
const EMBED_FIELD_LIMIT: usize = 1024;

const ACCEPTED_COLOUR: u32 = 0x00FF00;
const REJECTED_COLOUR: u32 = 0xFF0000;

/// Something the bot wants to tell the user who issued a command.
#[derive(Debug, Clone)]
pub enum Reply {
    Text { content: String, ephemeral: bool },
    Report(SubmissionReport),
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self::Text { content: content.into(), ephemeral: false }
    }

    pub fn private(content: impl Into<String>) -> Self {
        Self::Text { content: content.into(), ephemeral: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("missing permissions to reply here")]
    PermissionDenied,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serenity::Error> for ReplyError {
    fn from(err: serenity::Error) -> Self {
        if is_permission_error(&err) {
            ReplyError::PermissionDenied
        } else {
            ReplyError::Other(err.into())
        }
    }
}

fn is_permission_error(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 403 || response.error.code == MISSING_PERMISSIONS
        }
        _ => false,
    }
}

/// Where replies to one command go.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Replies where the command was issued.
    async fn reply(&self, reply: &Reply) -> Result<(), ReplyError>;

    /// Sends the reply privately to the user who issued the command.
    async fn direct_message(&self, reply: &Reply) -> Result<(), ReplyError>;
}

/// Replies on `channel`, falling back to a direct message when the bot isn't
/// allowed to post there.
pub async fn safe_reply<C: ReplyChannel + ?Sized>(channel: &C, reply: &Reply) {
    let result = match channel.reply(reply).await {
        Err(ReplyError::PermissionDenied) => {
            log::warn!("Not allowed to reply in channel, sending a direct message instead.");
            channel.direct_message(reply).await
        }
        result => result,
    };

    if let Err(err) = result {
        log::error!("Error sending reply: {err:?}");
    }
}

fn report_embed(report: &SubmissionReport) -> CreateEmbed {
    CreateEmbed::new()
        .title(report.title())
        .description(format!("**{}**", report.verdict.verdict))
        .colour(if report.accepted() { ACCEPTED_COLOUR } else { REJECTED_COLOUR })
        .field("Time", &report.verdict.time, true)
        .field("Memory", &report.verdict.memory, true)
        .field("Code", report.code_block(EMBED_FIELD_LIMIT), false)
}

fn create_message(reply: &Reply) -> CreateMessage {
    match reply {
        Reply::Text { content, .. } => CreateMessage::new().content(content),
        Reply::Report(report) => CreateMessage::new().embed(report_embed(report)),
    }
}

/// Replies to a slash command, as a follow-up once it has been deferred.
pub struct InteractionChannel<'a> {
    pub ctx: &'a Context,
    pub command: &'a CommandInteraction,
    pub deferred: bool,
}

#[async_trait]
impl ReplyChannel for InteractionChannel<'_> {
    async fn reply(&self, reply: &Reply) -> Result<(), ReplyError> {
        if self.deferred {
            let followup = match reply {
                Reply::Text { content, ephemeral } => CreateInteractionResponseFollowup::new()
                    .content(content)
                    .ephemeral(*ephemeral),
                Reply::Report(report) => {
                    CreateInteractionResponseFollowup::new().embed(report_embed(report))
                }
            };
            self.command.create_followup(self.ctx, followup).await?;
        } else {
            let message = match reply {
                Reply::Text { content, ephemeral } => CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(*ephemeral),
                Reply::Report(report) => {
                    CreateInteractionResponseMessage::new().embed(report_embed(report))
                }
            };
            self.command
                .create_response(self.ctx, CreateInteractionResponse::Message(message))
                .await?;
        }
        Ok(())
    }

    async fn direct_message(&self, reply: &Reply) -> Result<(), ReplyError> {
        self.command.user.direct_message(self.ctx, create_message(reply)).await?;
        Ok(())
    }
}

/// Replies to a text command in the channel it was sent in.
pub struct MessageChannel<'a> {
    pub ctx: &'a Context,
    pub msg: &'a Message,
}

#[async_trait]
impl ReplyChannel for MessageChannel<'_> {
    async fn reply(&self, reply: &Reply) -> Result<(), ReplyError> {
        self.msg.channel_id.send_message(self.ctx, create_message(reply)).await?;
        Ok(())
    }

    async fn direct_message(&self, reply: &Reply) -> Result<(), ReplyError> {
        self.msg.author.direct_message(self.ctx, create_message(reply)).await?;
        Ok(())
    }
}
