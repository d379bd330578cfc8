use std::net::SocketAddr;
use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::{
    error::Result,
    rpc::proto::{
        FindIdRequest, FindIdResponse, RoleRequest, RoleResponse,
        identity_server::{Identity, IdentityServer},
    },
    services::auth::AuthCore,
};

/// Answers identity questions from other services.
#[derive(Clone)]
pub struct IdentityService {
    core: Arc<AuthCore>,
}

impl IdentityService {
    /// Creates a new `IdentityService`.
    pub fn new(core: Arc<AuthCore>) -> Self {
        Self { core }
    }

    /// Wraps the service for a tonic router.
    pub fn into_server(self) -> IdentityServer<Self> {
        IdentityServer::new(self)
    }
}

#[tonic::async_trait]
impl Identity for IdentityService {
    async fn get_id(
        &self,
        request: Request<FindIdRequest>,
    ) -> std::result::Result<Response<FindIdResponse>, Status> {
        let sid = request.into_inner().sid;
        let user_id = self.core.resolve_user_id(&sid).await.map_err(|e| {
            tracing::warn!("GetId failed: {}", e);
            Status::from(e)
        })?;

        Ok(Response::new(FindIdResponse { user_id }))
    }

    async fn get_role(
        &self,
        request: Request<RoleRequest>,
    ) -> std::result::Result<Response<RoleResponse>, Status> {
        let user_id = request.into_inner().user_id;
        let role = self.core.resolve_user_role(user_id).await.map_err(|e| {
            tracing::warn!("GetRole failed for {}: {}", user_id, e);
            Status::from(e)
        })?;

        Ok(Response::new(RoleResponse { role }))
    }
}

/// Serves the identity RPC on `addr` until the process stops.
pub async fn serve(core: Arc<AuthCore>, addr: SocketAddr) -> Result<()> {
    tracing::info!("🚀 Identity RPC listening on {}", addr);
    tonic::transport::Server::builder()
        .add_service(IdentityService::new(core).into_server())
        .serve(addr)
        .await?;
    Ok(())
}
