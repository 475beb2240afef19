// API endpoints (relative to the configured base URL)
pub const LOGIN_PATH: &str = "/users/login";
pub const REGISTER_PATH: &str = "/users/register";
pub const REFRESH_PATH: &str = "/users/refresh-token";
pub const LOGOUT_PATH: &str = "/users/logout";

pub const DEFAULT_API_URL: &str = "https://edu-pulse-backend-plum.vercel.app/api/v1";
pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Persisted cookie names
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const ROLE_COOKIE: &str = "role";
pub const USER_COOKIE: &str = "user";
pub const COOKIE_MAX_AGE_DAYS: i64 = 7;

// Front-end routes
pub const ROOT_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/auth/login";
pub const REGISTER_ROUTE: &str = "/auth/register";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
pub const INSTRUCTOR_DASHBOARD: &str = "/instructor/dashboard";
pub const STUDENT_DASHBOARD: &str = "/student/dashboard";

// Edge gate server defaults
pub const DEFAULT_GATE_HOST: &str = "0.0.0.0";
pub const DEFAULT_GATE_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "./out";
