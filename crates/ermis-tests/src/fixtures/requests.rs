//! Scenario requests.
//!
//! Maps each [`RequestKind`] to the HTTP call and payload it sends. Every
//! PATCH starts from the defaults and keeps the alias's current hostgroup,
//! except for "move" which swaps it.

use crate::expectations::RequestKind;
use crate::fixtures::alias::{
    malformed_payload, toggle_hostgroup, AliasPayload, UPDATED_BEST_HOSTS,
};
use crate::fixtures::ermis_client::{ApiResponse, ErmisClient, ErmisClientError};
use tracing::debug;

/// What a scenario request needs besides its kind.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub alias_name: &'a str,

    /// Hostgroup chosen by the scenario. Only "post" needs one.
    pub hostgroup: Option<&'a str>,

    pub node: &'a str,

    /// Alarm in its input form, `name:recipient:parameter`.
    pub alarm: &'a str,
}

impl ErmisClient {
    /// Send the request of a "when" step.
    ///
    /// Status codes are returned as-is. Errors are transport failures, an
    /// alias that has to exist but does not, and hostgroup problems.
    pub async fn perform(
        &self,
        kind: RequestKind,
        context: &RequestContext<'_>,
    ) -> Result<ApiResponse, ErmisClientError> {
        let alias_name = context.alias_name;
        debug!(kind = ?kind, alias = %alias_name, "Performing scenario request");

        let payload = match kind {
            RequestKind::Get => return self.list_aliases().await,
            RequestKind::Post => {
                let hostgroup = context
                    .hostgroup
                    .ok_or(ErmisClientError::MissingHostgroup)?;
                return self
                    .create_alias(&AliasPayload::defaults(alias_name, hostgroup))
                    .await;
            }
            RequestKind::MalformedPost => return self.create_alias(&malformed_payload()).await,
            RequestKind::Delete => return self.delete_alias(alias_name).await,
            RequestKind::Update => self
                .current_payload(alias_name)
                .await?
                .with_best_hosts(UPDATED_BEST_HOSTS),
            RequestKind::Move => {
                let current = self.fetch_alias_object(alias_name).await?;
                let target = toggle_hostgroup(&current.hostgroup)
                    .ok_or(ErmisClientError::UnmovableHostgroup(current.hostgroup))?;
                AliasPayload::defaults(alias_name, target)
            }
            RequestKind::CreateNode => self
                .current_payload(alias_name)
                .await?
                .with_nodes(vec![context.node.to_string()], vec![]),
            RequestKind::UpdateNodes => self
                .current_payload(alias_name)
                .await?
                .with_nodes(vec![], vec![context.node.to_string()]),
            RequestKind::DeleteNode => self
                .current_payload(alias_name)
                .await?
                .with_nodes(vec![], vec![]),
            RequestKind::AddAlarm => self
                .current_payload(alias_name)
                .await?
                .with_alarms(vec![context.alarm.to_string()]),
            RequestKind::DeleteAlarm => self
                .current_payload(alias_name)
                .await?
                .with_alarms(vec![]),
        };

        self.patch_alias(alias_name, &payload).await
    }

    /// Defaults in the hostgroup the alias is in now.
    async fn current_payload(&self, alias_name: &str) -> Result<AliasPayload, ErmisClientError> {
        let current = self.fetch_alias_object(alias_name).await?;
        Ok(AliasPayload::defaults(alias_name, current.hostgroup))
    }
}
