//! OpenAPI documentation, served at `/api/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::auth;
use crate::error;
use crate::handlers;
use docvault_core::UserLevel;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docvault API",
        version = "0.1.0",
        description = "Document service: bulk replacement of the document set from an uploaded archive (ZIP, TAR, TAR.GZ), PDF retrieval by id, and sign-in."
    ),
    paths(
        handlers::upload::upload_archive,
        handlers::documents::get_document,
        handlers::sign_in::sign_in,
        handlers::diagnostics::hello,
        handlers::diagnostics::db_status,
    ),
    components(schemas(
        handlers::upload::UploadResponse,
        handlers::diagnostics::HelloResponse,
        handlers::diagnostics::DbStatusResponse,
        auth::SignInRequest,
        auth::SignInResponse,
        error::ErrorResponse,
        error::UploadFailureResponse,
        UserLevel,
    )),
    tags(
        (name = "documents", description = "Document upload and retrieval"),
        (name = "auth", description = "Sign-in"),
        (name = "diagnostics", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/upload",
            "/documents/{id}",
            "/api/user/signIn",
            "/hello",
            "/api/db-status",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
