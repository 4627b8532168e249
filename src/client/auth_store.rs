use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tracing::{debug, warn};

use super::rpc_client::RpcClient;
use crate::models::User;
use crate::rpc::{AuthOutput, Credentials, LogoutOutput};

/// What the UI observes: the signed-in user, if any, and whether a call is in
/// flight.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutResult {
    pub success: bool,
}

/// A writable, observable auth state backed by the `login`, `logout` and
/// `register` procedures.
///
/// `user` only becomes `Some` after a successful login or register and only
/// returns to `None` after a successful logout. Failed calls leave it alone.
pub struct AuthStore {
    client: RpcClient,
    state: watch::Sender<AuthState>,
    in_flight: AtomicUsize,
}

/// Counts one call as in flight. `loading` stays true until the last
/// overlapping call finishes, including when a caller drops its future early.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<AuthState>,
    in_flight: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn start(store: &'a AuthStore) -> Self {
        // The counter changes under the channel's write lock.
        store.state.send_modify(|s| {
            store.in_flight.fetch_add(1, Ordering::SeqCst);
            s.loading = true;
        });
        LoadingGuard {
            state: &store.state,
            in_flight: &store.in_flight,
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let in_flight = self.in_flight;
        self.state.send_modify(|s| {
            s.loading = in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        });
    }
}

impl AuthStore {
    pub fn new(client: RpcClient) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        AuthStore {
            client,
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn set(&self, value: AuthState) {
        self.state.send_replace(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(f);
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    async fn authenticate(&self, procedure: &str, username: &str, password: &str) -> Option<User> {
        let _loading = LoadingGuard::start(self);
        let result = self
            .client
            .mutation::<_, AuthOutput>(procedure, &Self::credentials(username, password))
            .await;

        match result {
            Ok(AuthOutput { user: Some(user) }) => {
                debug!("{} succeeded for '{}'", procedure, user.username);
                self.update(|s| s.user = Some(user.clone()));
                Some(user)
            }
            Ok(AuthOutput { user: None }) => {
                warn!("{} returned no user", procedure);
                None
            }
            Err(e) => {
                warn!("{} failed: {}", procedure, e);
                None
            }
        }
    }

    /// Returns the user on success, `None` otherwise.
    pub async fn login(&self, username: &str, password: &str) -> Option<User> {
        self.authenticate("login", username, password).await
    }

    /// Returns the new user on success, `None` otherwise.
    pub async fn register(&self, username: &str, password: &str) -> Option<User> {
        self.authenticate("register", username, password).await
    }

    pub async fn logout(&self) -> LogoutResult {
        let _loading = LoadingGuard::start(self);
        match self.client.query::<LogoutOutput>("logout").await {
            Ok(LogoutOutput { success: true }) => {
                self.update(|s| s.user = None);
                LogoutResult { success: true }
            }
            Ok(LogoutOutput { success: false }) => {
                warn!("logout was not accepted by the server");
                LogoutResult { success: false }
            }
            Err(e) => {
                warn!("logout failed: {}", e);
                LogoutResult { success: false }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};

    const ADAM: &str = r#"{"result":{"data":{"user":{"id":"u1","username":"adam"}}}}"#;

    async fn store_for(server: &ServerGuard) -> AuthStore {
        AuthStore::new(RpcClient::new(server.url()).unwrap())
    }

    #[tokio::test]
    async fn test_initial_state() {
        let server = Server::new_async().await;
        let store = store_for(&server).await;
        assert_eq!(store.get(), AuthState::default());
        assert!(store.get().user.is_none());
        assert!(!store.get().loading);
    }

    #[tokio::test]
    async fn test_login_sets_user_until_logout() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/trpc/login")
            .with_status(200)
            .with_body(ADAM)
            .create_async()
            .await;
        let _logout = server
            .mock("GET", "/trpc/logout")
            .with_status(200)
            .with_body(r#"{"result":{"data":{"success":true}}}"#)
            .create_async()
            .await;

        let store = store_for(&server).await;
        let mut rx = store.subscribe();

        let user = store.login("adam", "secret1").await.expect("login should succeed");
        assert_eq!(user, User::new("u1", "adam"));
        assert_eq!(store.get().user, Some(user));
        assert!(!store.get().loading);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().user.is_some());

        let result = store.logout().await;
        assert!(result.success);
        assert_eq!(store.get().user, None);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_untouched() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/trpc/login")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect username or password","code":"UNAUTHORIZED"}}"#)
            .create_async()
            .await;

        let store = store_for(&server).await;
        assert_eq!(store.login("adam", "wrong").await, None);
        assert_eq!(store.get(), AuthState::default());
    }

    #[tokio::test]
    async fn test_response_without_user_is_a_failure() {
        let mut server = Server::new_async().await;
        let _register = server
            .mock("POST", "/trpc/register")
            .with_status(200)
            .with_body(r#"{"result":{"data":{}}}"#)
            .create_async()
            .await;

        let store = store_for(&server).await;
        assert_eq!(store.register("adam", "secret1").await, None);
        assert!(store.get().user.is_none());
    }

    #[tokio::test]
    async fn test_register_sets_user() {
        let mut server = Server::new_async().await;
        let _register = server
            .mock("POST", "/trpc/register")
            .with_status(200)
            .with_body(ADAM)
            .create_async()
            .await;

        let store = store_for(&server).await;
        assert!(store.register("adam", "secret1").await.is_some());
        assert_eq!(store.get().user, Some(User::new("u1", "adam")));
    }

    #[tokio::test]
    async fn test_failed_logout_keeps_user() {
        let mut server = Server::new_async().await;
        let _logout = server
            .mock("GET", "/trpc/logout")
            .with_status(200)
            .with_body(r#"{"result":{"data":{"success":false}}}"#)
            .create_async()
            .await;

        let store = store_for(&server).await;
        store.set(AuthState {
            user: Some(User::new("u1", "adam")),
            loading: false,
        });

        assert_eq!(store.logout().await, LogoutResult { success: false });
        assert_eq!(store.get().user, Some(User::new("u1", "adam")));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_failure() {
        // Nothing listens on port 1.
        let store = AuthStore::new(RpcClient::new("http://127.0.0.1:1").unwrap());
        assert_eq!(store.login("adam", "secret1").await, None);
        assert!(!store.logout().await.success);
        assert!(!store.get().loading);
    }

    #[tokio::test]
    async fn test_loading_while_login_is_in_flight() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/trpc/login")
            .with_status(200)
            .with_body(ADAM)
            .create_async()
            .await;

        let store = store_for(&server).await;
        let mut rx = store.subscribe();

        // `login` sets `loading` before its first await.
        let (user, seen) = tokio::join!(store.login("adam", "secret1"), async {
            rx.wait_for(|s| s.loading)
                .await
                .map(|s| s.clone())
                .expect("store should stay alive")
        });

        assert!(seen.loading);
        assert!(seen.user.is_none());
        assert!(user.is_some());
        assert!(!store.get().loading);
        assert!(store.get().user.is_some());
    }

    #[tokio::test]
    async fn test_loading_until_last_overlapping_call_ends() {
        let server = Server::new_async().await;
        let store = store_for(&server).await;

        let first = LoadingGuard::start(&store);
        let second = LoadingGuard::start(&store);
        assert!(store.get().loading);

        drop(first);
        assert!(store.get().loading);

        drop(second);
        assert!(!store.get().loading);

        let third = LoadingGuard::start(&store);
        assert!(store.get().loading);
        drop(third);
        assert!(!store.get().loading);
    }

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let server = Server::new_async().await;
        let store = store_for(&server).await;
        let mut rx = store.subscribe();
        store.update(|s| s.loading = true);
        rx.changed().await.unwrap();
        assert!(rx.borrow().loading);
    }
}
