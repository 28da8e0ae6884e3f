use error_stack::ResultExt;
use google_sheets4::oauth2::{self, authenticator::Authenticator};
use google_sheets4::{hyper, hyper_rustls};

use super::http_client::HttpsClient;
use super::worksheet_manager::WorksheetError;

/// Builds a service-account authenticator over the shared client. Auth
/// failures are fatal for any sheet operation and carry the account email.
pub async fn auth(
    credentials: oauth2::ServiceAccountKey,
    client: HttpsClient,
) -> error_stack::Result<
    Authenticator<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>,
    WorksheetError,
> {
    let client_email = credentials.client_email.clone();
    oauth2::ServiceAccountAuthenticator::with_client(credentials, client)
        .build()
        .await
        .change_context(WorksheetError::AuthFailed)
        .attach_printable_lazy(|| format!("service account: {client_email}"))
}
