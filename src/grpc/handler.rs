use super::{
    pb::{
        auth_server::{Auth as AuthRpc, AuthServer},
        IsAdminRequest, IsAdminResponse, LoginRequest, LoginResponse, RegisterRequest,
        RegisterResponse,
    },
    validate,
};
use crate::auth::{Auth, Error, ErrorKind};
use std::sync::Arc;
use tonic::{Request, Response, Status};

#[derive(Clone)]
pub struct AuthHandler {
    auth: Arc<Auth>,
}

impl AuthHandler {
    #[must_use]
    pub fn new(auth: Arc<Auth>) -> Self {
        Self { auth }
    }
}

#[must_use]
pub fn server(auth: Arc<Auth>) -> AuthServer<AuthHandler> {
    AuthServer::new(AuthHandler::new(auth))
}

#[tonic::async_trait]
impl AuthRpc for AuthHandler {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let mut request = request.into_inner();
        request.email = validate::normalize_email(&request.email);
        validate::login(&request).map_err(|err| Status::invalid_argument(err.to_string()))?;

        let token = self
            .auth
            .login(&request.email, &request.password, request.app_id)
            .await
            .map_err(|err| credentials_status(&err))?;

        Ok(Response::new(LoginResponse { token }))
    }

    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let mut request = request.into_inner();
        request.email = validate::normalize_email(&request.email);
        validate::register(&request).map_err(|err| Status::invalid_argument(err.to_string()))?;

        let user_id = self
            .auth
            .register(&request.email, &request.password)
            .await
            .map_err(|err| credentials_status(&err))?;

        Ok(Response::new(RegisterResponse { user_id }))
    }

    async fn is_admin(
        &self,
        request: Request<IsAdminRequest>,
    ) -> Result<Response<IsAdminResponse>, Status> {
        let request = request.into_inner();
        validate::is_admin(&request).map_err(|err| Status::invalid_argument(err.to_string()))?;

        let is_admin = self
            .auth
            .is_admin(request.user_id)
            .await
            .map_err(|err| admin_status(&err))?;

        Ok(Response::new(IsAdminResponse { is_admin }))
    }
}

/// Status for `Login` and `Register` failures. Internal details stay in the logs.
pub(crate) fn credentials_status(err: &Error) -> Status {
    match err.kind() {
        ErrorKind::InvalidCredentials => Status::invalid_argument("invalid email or password"),
        ErrorKind::InvalidAppId => Status::invalid_argument("invalid app id"),
        ErrorKind::UserAlreadyExists => Status::already_exists("user already exists"),
        ErrorKind::Internal => Status::internal("internal error"),
    }
}

/// Status for `IsAdmin` failures. An unknown user id is indistinguishable
/// from a backend failure.
pub(crate) fn admin_status(_: &Error) -> Status {
    Status::internal("internal error")
}
