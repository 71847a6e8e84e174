use super::*;

// =============================================================================
// translate_auth_code
// =============================================================================

#[test]
fn credential_codes_share_one_message() {
    for code in ["auth/invalid-credential", "auth/wrong-password", "auth/user-not-found"] {
        assert_eq!(translate_auth_code(code), MSG_INVALID_CREDENTIALS, "code {code}");
    }
}

#[test]
fn known_codes_map_to_specific_messages() {
    assert_eq!(translate_auth_code("auth/email-already-in-use"), MSG_EMAIL_IN_USE);
    assert_eq!(translate_auth_code("auth/weak-password"), MSG_WEAK_PASSWORD);
    assert_eq!(translate_auth_code("auth/popup-closed-by-user"), MSG_POPUP_CLOSED);
}

#[test]
fn unknown_code_maps_to_generic_message() {
    assert_eq!(translate_auth_code("auth/network-request-failed"), MSG_AUTH_GENERIC);
    assert_eq!(translate_auth_code(""), MSG_AUTH_GENERIC);
}

#[test]
fn user_message_covers_non_provider_errors() {
    assert_eq!(AuthError::PasswordMismatch.user_message(), MSG_PASSWORD_MISMATCH);
    assert_eq!(AuthError::Request("timeout".into()).user_message(), MSG_AUTH_GENERIC);
    assert_eq!(AuthError::provider("auth/weak-password").user_message(), MSG_WEAK_PASSWORD);
}

#[test]
fn code_only_present_for_provider_errors() {
    assert_eq!(AuthError::provider("auth/user-disabled").code(), Some("auth/user-disabled"));
    assert_eq!(AuthError::MissingApiKey.code(), None);
}

// =============================================================================
// normalize_provider_error
// =============================================================================

#[test]
fn normalize_maps_rest_errors_to_codes() {
    assert_eq!(normalize_provider_error("EMAIL_NOT_FOUND"), "auth/user-not-found");
    assert_eq!(normalize_provider_error("INVALID_PASSWORD"), "auth/wrong-password");
    assert_eq!(normalize_provider_error("INVALID_LOGIN_CREDENTIALS"), "auth/invalid-credential");
    assert_eq!(normalize_provider_error("EMAIL_EXISTS"), "auth/email-already-in-use");
}

#[test]
fn normalize_strips_detail_suffix() {
    assert_eq!(
        normalize_provider_error("WEAK_PASSWORD : Password should be at least 6 characters"),
        "auth/weak-password"
    );
}

#[test]
fn normalize_unknown_error_keeps_shape() {
    assert_eq!(normalize_provider_error("OPERATION_NOT_ALLOWED"), "auth/operation-not-allowed");
}

// =============================================================================
// GatewayError
// =============================================================================

#[test]
fn message_or_prefers_server_message() {
    let err = GatewayError::Status { status: 404, message: Some("Lista não encontrada".into()) };
    assert_eq!(err.message_or("fallback"), "Lista não encontrada");
}

#[test]
fn message_or_falls_back_for_blank_or_missing_message() {
    let blank = GatewayError::Status { status: 500, message: Some("  ".into()) };
    assert_eq!(blank.message_or("fallback"), "fallback");
    assert_eq!(GatewayError::Request("reset".into()).message_or("fallback"), "fallback");
}

#[test]
fn auth_error_converts_into_gateway_error() {
    let err: GatewayError = AuthError::MissingApiKey.into();
    assert!(matches!(err, GatewayError::Credential(AuthError::MissingApiKey)));
}
