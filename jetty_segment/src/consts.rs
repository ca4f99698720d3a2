pub const AUTH_HEADER: &str = "Authorization";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const ACCEPT_HEADER: &str = "Accept";
pub const SEGMENT_CONTENT_TYPE: &str = "application/vnd.segment.v1+json";

pub const DEFAULT_BASE_URL: &str = "https://api.segmentapis.com/";
pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const PAGE_COUNT_PARAM: &str = "pagination[count]";
pub const PAGE_CURSOR_PARAM: &str = "pagination[cursor]";

pub const USERS: &str = "users";
pub const GROUPS: &str = "groups";
pub const ROLES: &str = "roles";
pub const SOURCES: &str = "sources";
pub const WAREHOUSES: &str = "warehouses";
pub const FUNCTIONS: &str = "functions";
pub const SPACES: &str = "spaces";
pub const PERMISSIONS: &str = "permissions";

/// Function sub-types, in listing order.
pub const FUNCTION_SUBTYPES: [&str; 3] = ["DESTINATION", "INSERT_DESTINATION", "SOURCE"];

/// Roles whose name contains this apply to the whole workspace.
pub const WORKSPACE_ROLE_MARKER: &str = "Workspace";

pub const REMOVE_MEMBER_SUCCESS: &str = "SUCCESS";
