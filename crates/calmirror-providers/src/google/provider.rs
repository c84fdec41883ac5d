//! [`CalendarGateway`] implementation for Google Calendar.

use calmirror_core::{EventHandle, EventRecord, NewEvent, SyncWindow};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarGateway, CalendarHandle, CalendarInfo};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// Tokens and the API client built from them.
#[derive(Debug, Default)]
struct Session {
    tokens: Option<TokenInfo>,
    client: Option<GoogleCalendarClient>,
}

/// Google Calendar gateway.
///
/// Talks to Calendar API v3 with tokens obtained through
/// [`authenticate`](Self::authenticate) and refreshes the access token
/// before any call once it has expired.
pub struct GoogleGateway {
    config: GoogleConfig,
    display_name: String,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    session: TokioMutex<Session>,
}

impl GoogleGateway {
    /// Creates a gateway and loads any stored tokens. Does not touch the
    /// network.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;

        let display_name = config.provider_name();
        let token_storage = TokenStorage::new(&config.token_path);
        let tokens = token_storage.load()?;
        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            display_name,
            token_storage,
            oauth_client,
            session: TokioMutex::new(Session {
                tokens,
                client: None,
            }),
        })
    }

    /// Runs the browser-based OAuth flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
            .map_err(|e| e.with_provider(&self.display_name))?;

        self.token_storage.save(&tokens)?;

        let client = self.build_client(&tokens.access_token)?;
        let mut session = self.session.lock().await;
        session.tokens = Some(tokens);
        session.client = Some(client);

        info!("authentication successful, tokens saved to {}", self.token_storage.path().display());
        Ok(())
    }

    /// Returns true if stored tokens are usable, directly or after a refresh.
    pub async fn is_authenticated(&self) -> bool {
        self.session
            .lock()
            .await
            .tokens
            .as_ref()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }

    /// Returns true if there are no tokens or they lack a configured scope
    /// (e.g. tokens granted read-only access).
    pub async fn needs_reauth(&self) -> bool {
        match self.session.lock().await.tokens.as_ref() {
            None => true,
            Some(tokens) => !tokens.has_scopes(&self.config.scopes),
        }
    }

    fn build_client(&self, access_token: &str) -> ProviderResult<GoogleCalendarClient> {
        GoogleCalendarClient::new(access_token, self.config.timeout, &self.config.user_agent)
    }

    /// Returns an API client with a valid access token, refreshing and
    /// persisting tokens first when they have expired.
    async fn client(&self) -> ProviderResult<GoogleCalendarClient> {
        let mut session = self.session.lock().await;

        let tokens = session.tokens.as_mut().ok_or_else(|| {
            ProviderError::authentication("not authenticated - run 'calmirror auth google'")
                .with_provider(&self.display_name)
        })?;

        if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
                ProviderError::authentication(
                    "access token expired and no refresh token - run 'calmirror auth google --force'",
                )
                .with_provider(&self.display_name)
            })?;

            debug!("refreshing expired access token");
            let (access_token, expires_in) = self
                .oauth_client
                .refresh_token(&refresh_token)
                .await
                .map_err(|e| e.with_provider(&self.display_name))?;

            tokens.update_access_token(&access_token, expires_in);
            self.token_storage.save(tokens)?;

            let client = self.build_client(&access_token)?;
            session.client = Some(client);
        }

        if let Some(client) = session.client.as_ref() {
            return Ok(client.clone());
        }

        let access_token = session
            .tokens
            .as_ref()
            .map(|t| t.access_token.clone())
            .unwrap_or_default();
        let client = self.build_client(&access_token)?;
        session.client = Some(client.clone());
        Ok(client)
    }

    fn tag(&self, err: ProviderError) -> ProviderError {
        err.with_provider(&self.display_name)
    }

    async fn resolve_impl(&self, id: &str) -> ProviderResult<CalendarHandle> {
        let client = self.client().await?;
        let entry = client.get_calendar(id).await.map_err(|e| self.tag(e))?;
        Ok(CalendarHandle::new(entry.id.clone(), entry.display_name()))
    }

    async fn list_events_impl(
        &self,
        calendar: &CalendarHandle,
        window: &SyncWindow,
    ) -> ProviderResult<Vec<EventRecord>> {
        let client = self.client().await?;
        client
            .list_events(&calendar.id, window.start, window.end)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn create_impl(
        &self,
        calendar: &CalendarHandle,
        event: &NewEvent,
        all_day: bool,
    ) -> ProviderResult<EventHandle> {
        if event.is_all_day() != all_day {
            return Err(self.tag(ProviderError::bad_request(format!(
                "'{}': all-day flag does not match the creation call",
                event.title
            ))));
        }

        let client = self.client().await?;
        let id = client
            .insert_event(&calendar.id, event)
            .await
            .map_err(|e| self.tag(e))?;
        Ok(EventHandle::new(&calendar.id, id))
    }

    async fn delete_impl(&self, event: &EventHandle) -> ProviderResult<()> {
        let client = self.client().await?;
        client
            .delete_event(&event.calendar_id, &event.event_id)
            .await
            .map_err(|e| self.tag(e))
    }

    async fn list_calendars_impl(&self) -> ProviderResult<Vec<CalendarInfo>> {
        let client = self.client().await?;
        let calendars = client.list_calendars().await.map_err(|e| self.tag(e))?;

        Ok(calendars
            .into_iter()
            .map(|c| {
                let mut info =
                    CalendarInfo::new(&c.id, c.display_name()).with_primary(c.primary);
                if let Some(role) = c.access_role {
                    info = info.with_access_role(role);
                }
                info
            })
            .collect())
    }
}

impl CalendarGateway for GoogleGateway {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn resolve_calendar<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<CalendarHandle>> {
        Box::pin(self.resolve_impl(id))
    }

    fn list_events<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        window: &'a SyncWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<EventRecord>>> {
        Box::pin(self.list_events_impl(calendar, window))
    }

    fn create_event<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventHandle>> {
        Box::pin(self.create_impl(calendar, event, false))
    }

    fn create_all_day_event<'a>(
        &'a self,
        calendar: &'a CalendarHandle,
        event: &'a NewEvent,
    ) -> BoxFuture<'a, ProviderResult<EventHandle>> {
        Box::pin(self.create_impl(calendar, event, true))
    }

    fn delete_event<'a>(&'a self, event: &'a EventHandle) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.delete_impl(event))
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(self.list_calendars_impl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::OAuthCredentials;
    use calmirror_core::EventTime;
    use chrono::{Duration, NaiveDate, Utc};

    fn test_config(dir: &tempfile::TempDir) -> GoogleConfig {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        GoogleConfig::new(credentials).with_token_path(dir.path().join("tokens.json"))
    }

    #[tokio::test]
    async fn gateway_without_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = GoogleGateway::new(test_config(&dir)).unwrap();

        assert_eq!(gateway.name(), "google:default");
        assert!(!gateway.is_authenticated().await);
        assert!(gateway.needs_reauth().await);

        let err = gateway.resolve_calendar("primary").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some("google:default"));
    }

    #[tokio::test]
    async fn gateway_loads_stored_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let tokens = TokenInfo::new(
            "access",
            Some("refresh".to_string()),
            Some(3600),
            vec![GoogleConfig::DEFAULT_SCOPE.to_string()],
        );
        TokenStorage::new(&config.token_path).save(&tokens).unwrap();

        let gateway = GoogleGateway::new(config).unwrap();
        assert!(gateway.is_authenticated().await);
        assert!(!gateway.needs_reauth().await);
    }

    #[tokio::test]
    async fn read_only_tokens_need_reauth() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let tokens = TokenInfo::new(
            "access",
            Some("refresh".to_string()),
            Some(3600),
            vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        );
        TokenStorage::new(&config.token_path).save(&tokens).unwrap();

        let gateway = GoogleGateway::new(config).unwrap();
        assert!(gateway.needs_reauth().await);
    }

    #[tokio::test]
    async fn expired_tokens_without_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mut tokens = TokenInfo::new("access", None, Some(3600), vec![]);
        tokens.expires_at = Some(Utc::now() - Duration::hours(1));
        TokenStorage::new(&config.token_path).save(&tokens).unwrap();

        let gateway = GoogleGateway::new(config).unwrap();
        assert!(!gateway.is_authenticated().await);

        let err = gateway.list_calendars().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("--force"));
    }

    #[tokio::test]
    async fn creation_call_must_match_all_day_flag() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = GoogleGateway::new(test_config(&dir)).unwrap();
        let calendar = CalendarHandle::new("dst", "Mirror");
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let event = NewEvent {
            title: "Offsite [Synced]".to_string(),
            description: String::new(),
            start: EventTime::from_date(day),
            end: EventTime::from_date(day.succ_opt().unwrap()),
        };

        let err = gateway.create_event(&calendar, &event).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::BadRequest);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir).with_scopes(vec![]);
        assert!(GoogleGateway::new(config).is_err());
    }
}
