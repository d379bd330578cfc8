use std::future::Future;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Response, Status};

use crate::{
    error::{AppError, Result},
    rpc::proto::{FindIdRequest, RoleRequest, identity_client::IdentityClient},
};

/// The message tonic's channel uses when it enforces `grpc-timeout` itself.
const CHANNEL_TIMEOUT_MESSAGE: &str = "Timeout expired";

/// Calls the authorization process to identify callers.
///
/// Each call carries the configured deadline to the server and is abandoned
/// locally once it passes. Dropping a call's future cancels the remote call.
#[derive(Clone)]
pub struct IdentityRpcClient {
    inner: IdentityClient<Channel>,
    timeout: Duration,
}

impl IdentityRpcClient {
    /// Binds the client to `url` without connecting; the channel dials on first use.
    pub fn connect_lazy(url: &str, timeout: Duration) -> Result<Self> {
        let channel = Endpoint::from_shared(url.to_string())?.connect_lazy();
        tracing::info!("✅ Identity RPC client bound to {}", url);
        Ok(Self::from_channel(channel, timeout))
    }

    /// Wraps an existing channel.
    pub fn from_channel(channel: Channel, timeout: Duration) -> Self {
        Self {
            inner: IdentityClient::new(channel),
            timeout,
        }
    }

    /// Resolves a session id to the owner's numeric id.
    pub async fn user_id(&self, sid: &str) -> Result<i64> {
        let mut request = Request::new(FindIdRequest {
            sid: sid.to_string(),
        });
        request.set_timeout(self.timeout);

        let mut client = self.inner.clone();
        let response = self.deadline("GetId", client.get_id(request)).await?;
        Ok(response.user_id)
    }

    /// Fetches the role of user `user_id`.
    pub async fn user_role(&self, user_id: i64) -> Result<String> {
        let mut request = Request::new(RoleRequest { user_id });
        request.set_timeout(self.timeout);

        let mut client = self.inner.clone();
        let response = self.deadline("GetRole", client.get_role(request)).await?;
        Ok(response.role)
    }

    async fn deadline<T>(
        &self,
        method: &str,
        call: impl Future<Output = std::result::Result<Response<T>, Status>>,
    ) -> Result<T> {
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Status::deadline_exceeded(format!("{method} deadline exceeded"))),
        };

        match outcome {
            Ok(response) => Ok(response.into_inner()),
            Err(status) => {
                let status = expired_as_deadline(status);
                tracing::error!("❌ {} call failed: {}", method, status);
                Err(AppError::Rpc(status))
            }
        }
    }
}

/// Reports the channel's own `grpc-timeout` expiry as `DeadlineExceeded`.
fn expired_as_deadline(status: Status) -> Status {
    if status.code() == Code::Cancelled && status.message() == CHANNEL_TIMEOUT_MESSAGE {
        return Status::deadline_exceeded(status.message());
    }
    status
}
