//! Campaign (re)generation.
//!
//! Generation is slow, so the API runs it as a background task and answers
//! right away; progress is observable through the session's subscription
//! feed.

use chrono::Utc;
use taleweaver_narrative::CampaignRequest;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use super::context::{SessionCommandResult, SessionContext};
use super::repository::CampaignDocument;
use crate::domain::commands::GenerateCampaign;
use crate::domain::lifecycle::SessionStatus;
use crate::error::SessionError;

/// Handles `GenerateCampaign`: asks the oracle for a campaign, validates it,
/// stores it, and mirrors it into the session's world state.
///
/// # Errors
///
/// `Forbidden` for non-hosts, `SessionFinished`, `OracleUnavailable`,
/// `InvalidCampaign` when the generated graph breaks its invariants, or
/// `Conflict` when a concurrent generation won.
#[instrument(skip_all, fields(session_id = %command.session_id))]
pub async fn handle_generate_campaign(
    command: &GenerateCampaign,
    ctx: &SessionContext,
) -> Result<SessionCommandResult, SessionError> {
    let session = ctx.sessions.load(command.session_id).await?;
    if !session.is_host(&command.user_id) {
        return Err(SessionError::Forbidden(
            "only the host may generate the campaign".to_owned(),
        ));
    }
    if session.status == SessionStatus::Finished {
        return Err(SessionError::SessionFinished);
    }

    let request = CampaignRequest {
        setting: &session.setting,
        category: session.world_state.setting_category,
        characters: &session.world_state.characters,
    };
    let response = ctx.oracle.generate_campaign(&request).await?;
    let structure = response.output;
    structure.validate()?;

    let version = ctx
        .campaigns
        .load(command.session_id)
        .await?
        .map_or(0, |existing| existing.version);
    let mut document = CampaignDocument {
        session_id: command.session_id,
        structure,
        generated_at: ctx.clock.now(),
        version,
    };
    ctx.campaigns.save(&mut document).await?;

    let clock = ctx.clock.as_ref();
    let mutation = ctx
        .sessions
        .mutate(command.session_id, |session| {
            session.mirror_campaign(&document.structure, command.correlation_id, clock)
        })
        .await?;
    info!(
        nodes = document.structure.nodes.len(),
        tokens_used = response.tokens_used,
        "campaign generated"
    );
    Ok(mutation.into())
}

/// Runs [`handle_generate_campaign`] on the runtime. Failures are logged;
/// the session stays as it was.
pub fn spawn_campaign_generation(
    command: GenerateCampaign,
    ctx: SessionContext,
) -> JoinHandle<Result<SessionCommandResult, SessionError>> {
    tokio::spawn(async move {
        let started = Utc::now();
        let result = handle_generate_campaign(&command, &ctx).await;
        if let Err(e) = &result {
            error!(
                session_id = %command.session_id,
                correlation_id = %command.correlation_id,
                error = %e,
                elapsed_ms = (Utc::now() - started).num_milliseconds(),
                "campaign generation failed"
            );
        }
        result
    })
}
