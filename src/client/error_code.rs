//! Usage: Closed error-code sets (server-reported, HTTP status, local) used for classification.

/// API error identifiers the server reports in `error_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerErrorCode {
    // Upload
    UploadStorageQuotaExceeded,
    UploadDailyQuotaExceeded,

    /// Root code for the invalid-parameter errors below; the specific code is in `invalid_parameters`.
    InvalidRequestInput,

    // Password-protected video playback
    VideoPasswordIncorrect,
    NoVideoPasswordProvided,

    // Authentication
    EmailTooLong,
    PasswordTooShort,
    PasswordTooSimple,
    NameInPassword,
    EmailNotRecognized,
    PasswordEmailMismatch,
    NoPasswordProvided,
    NoEmailProvided,
    InvalidEmail,
    NoNameProvided,
    NameTooLong,
    FacebookJoinInvalidToken,
    FacebookJoinNoToken,
    FacebookJoinMissingProperty,
    FacebookJoinMalformedToken,
    FacebookJoinDecryptFail,
    FacebookJoinTokenTooLong,
    FacebookLogInNoToken,
    FacebookLogInMissingProperty,
    FacebookLogInMalformedToken,
    FacebookLogInDecryptFail,
    FacebookLogInTokenTooLong,
    FacebookInvalidInputGrantType,
    FacebookJoinValidateTokenFail,
    FacebookInvalidNoInput,
    FacebookInvalidToken,
    FacebookMissingProperty,
    FacebookMalformedToken,
    EmailAlreadyRegistered,
    EmailBlocked,
    EmailSpammer,
    EmailPurgatory,
    UrlUnavailable,
    Timeout,
    TokenNotGenerated,
}

impl ServerErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            Self::UploadStorageQuotaExceeded => 4101,
            Self::UploadDailyQuotaExceeded => 4102,
            Self::InvalidRequestInput => 2204,
            Self::VideoPasswordIncorrect => 2222,
            Self::NoVideoPasswordProvided => 2223,
            Self::EmailTooLong => 2216,
            Self::PasswordTooShort => 2210,
            Self::PasswordTooSimple => 2211,
            Self::NameInPassword => 2212,
            Self::EmailNotRecognized => 2217,
            Self::PasswordEmailMismatch => 2218,
            Self::NoPasswordProvided => 2209,
            Self::NoEmailProvided => 2214,
            Self::InvalidEmail => 2215,
            Self::NoNameProvided => 2213,
            Self::NameTooLong => 2208,
            Self::FacebookJoinInvalidToken => 2303,
            Self::FacebookJoinNoToken => 2306,
            Self::FacebookJoinMissingProperty => 2304,
            Self::FacebookJoinMalformedToken => 2305,
            Self::FacebookJoinDecryptFail => 2307,
            Self::FacebookJoinTokenTooLong => 2308,
            Self::FacebookLogInNoToken => 2312,
            Self::FacebookLogInMissingProperty => 2310,
            Self::FacebookLogInMalformedToken => 2311,
            Self::FacebookLogInDecryptFail => 2313,
            Self::FacebookLogInTokenTooLong => 2314,
            Self::FacebookInvalidInputGrantType => 2221,
            Self::FacebookJoinValidateTokenFail => 2315,
            Self::FacebookInvalidNoInput => 2207,
            Self::FacebookInvalidToken => 2300,
            Self::FacebookMissingProperty => 2301,
            Self::FacebookMalformedToken => 2302,
            Self::EmailAlreadyRegistered => 2400,
            Self::EmailBlocked => 2401,
            Self::EmailSpammer => 2402,
            Self::EmailPurgatory => 2403,
            Self::UrlUnavailable => 2404,
            Self::Timeout => 5000,
            Self::TokenNotGenerated => 5001,
        }
    }

    pub fn from_code(value: i64) -> Option<Self> {
        Some(match value {
            4101 => Self::UploadStorageQuotaExceeded,
            4102 => Self::UploadDailyQuotaExceeded,
            2204 => Self::InvalidRequestInput,
            2222 => Self::VideoPasswordIncorrect,
            2223 => Self::NoVideoPasswordProvided,
            2216 => Self::EmailTooLong,
            2210 => Self::PasswordTooShort,
            2211 => Self::PasswordTooSimple,
            2212 => Self::NameInPassword,
            2217 => Self::EmailNotRecognized,
            2218 => Self::PasswordEmailMismatch,
            2209 => Self::NoPasswordProvided,
            2214 => Self::NoEmailProvided,
            2215 => Self::InvalidEmail,
            2213 => Self::NoNameProvided,
            2208 => Self::NameTooLong,
            2303 => Self::FacebookJoinInvalidToken,
            2306 => Self::FacebookJoinNoToken,
            2304 => Self::FacebookJoinMissingProperty,
            2305 => Self::FacebookJoinMalformedToken,
            2307 => Self::FacebookJoinDecryptFail,
            2308 => Self::FacebookJoinTokenTooLong,
            2312 => Self::FacebookLogInNoToken,
            2310 => Self::FacebookLogInMissingProperty,
            2311 => Self::FacebookLogInMalformedToken,
            2313 => Self::FacebookLogInDecryptFail,
            2314 => Self::FacebookLogInTokenTooLong,
            2221 => Self::FacebookInvalidInputGrantType,
            2315 => Self::FacebookJoinValidateTokenFail,
            2207 => Self::FacebookInvalidNoInput,
            2300 => Self::FacebookInvalidToken,
            2301 => Self::FacebookMissingProperty,
            2302 => Self::FacebookMalformedToken,
            2400 => Self::EmailAlreadyRegistered,
            2401 => Self::EmailBlocked,
            2402 => Self::EmailSpammer,
            2403 => Self::EmailPurgatory,
            2404 => Self::UrlUnavailable,
            5000 => Self::Timeout,
            5001 => Self::TokenNotGenerated,
            _ => return None,
        })
    }

    pub const fn is_upload_quota(self) -> bool {
        matches!(
            self,
            Self::UploadStorageQuotaExceeded | Self::UploadDailyQuotaExceeded
        )
    }
}

/// HTTP statuses the classifier consults directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpStatusCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
}

impl HttpStatusCode {
    pub const fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::ServiceUnavailable => 503,
        }
    }

    pub fn from_code(value: u16) -> Option<Self> {
        Some(match value {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            503 => Self::ServiceUnavailable,
            _ => return None,
        })
    }
}

/// Failures generated inside the client itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalErrorCode {
    /// A response failed but returned no error object.
    Undefined,
    /// A response returned successfully, but its body was not a valid dictionary.
    InvalidResponseDictionary,
    /// A request could not be initiated with the specified values.
    RequestMalformed,
    /// A cache-only request found no cached response.
    CachedResponseNotFound,
    /// No access token was returned with a successful authentication response.
    AuthToken,
    /// The code grant redirect carried no usable parameters.
    CodeGrant,
    /// The code grant redirect state did not match the state we sent.
    CodeGrantState,
    /// No response was returned for an authentication request.
    NoResponse,
    /// Pin code initiation did not return every required field.
    PinCodeInfo,
    /// The active pin code expired before it was authorized.
    PinCodeExpired,
    NoMappingClass,
    MappingFailed,
    /// Stored account data could not be decoded.
    AccountCorrupted,
}

impl LocalErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            Self::Undefined => 9000,
            Self::InvalidResponseDictionary => 9001,
            Self::RequestMalformed => 9002,
            Self::CachedResponseNotFound => 9003,
            Self::AuthToken => 9004,
            Self::CodeGrant => 9005,
            Self::CodeGrantState => 9006,
            Self::NoResponse => 9007,
            Self::PinCodeInfo => 9008,
            Self::PinCodeExpired => 9009,
            Self::NoMappingClass => 9010,
            Self::MappingFailed => 9011,
            Self::AccountCorrupted => 9012,
        }
    }

    pub fn from_code(value: i64) -> Option<Self> {
        Some(match value {
            9000 => Self::Undefined,
            9001 => Self::InvalidResponseDictionary,
            9002 => Self::RequestMalformed,
            9003 => Self::CachedResponseNotFound,
            9004 => Self::AuthToken,
            9005 => Self::CodeGrant,
            9006 => Self::CodeGrantState,
            9007 => Self::NoResponse,
            9008 => Self::PinCodeInfo,
            9009 => Self::PinCodeExpired,
            9010 => Self::NoMappingClass,
            9011 => Self::MappingFailed,
            9012 => Self::AccountCorrupted,
            _ => return None,
        })
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Undefined => "request failed without an error object",
            Self::InvalidResponseDictionary => "response body was not a valid dictionary",
            Self::RequestMalformed => "request could not be constructed",
            Self::CachedResponseNotFound => "no cached response for cache-only request",
            Self::AuthToken => "authentication response carried no access token",
            Self::CodeGrant => "code grant redirect carried no authorization code",
            Self::CodeGrantState => "code grant redirect state mismatch",
            Self::NoResponse => "no response for authentication request",
            Self::PinCodeInfo => "pin code response was missing required fields",
            Self::PinCodeExpired => "pin code expired",
            Self::NoMappingClass => "no model to map the response into",
            Self::MappingFailed => "response could not be mapped into the model",
            Self::AccountCorrupted => "stored account could not be decoded",
        }
    }
}
