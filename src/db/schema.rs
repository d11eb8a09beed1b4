//! Storefront DDL, applied by `Database::init_schema`

pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    username      VARCHAR(30)  NOT NULL UNIQUE,
    email         VARCHAR(255) NOT NULL UNIQUE,
    password_hash TEXT         NOT NULL,
    balance       NUMERIC      NOT NULL DEFAULT 0,
    role          VARCHAR(16)  NOT NULL DEFAULT 'user',
    is_active     BOOLEAN      NOT NULL DEFAULT TRUE,
    created_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    CONSTRAINT users_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT users_role_valid CHECK (role IN ('user', 'admin'))
)
"#;

pub const CREATE_ORDERS: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id                BIGSERIAL PRIMARY KEY,
    user_id           BIGINT       NOT NULL REFERENCES users(id),
    provider          VARCHAR(64)  NOT NULL,
    service_id        BIGINT       NOT NULL,
    link              VARCHAR(2048) NOT NULL,
    quantity          BIGINT       NOT NULL,
    total_price       NUMERIC      NOT NULL,
    status            VARCHAR(16)  NOT NULL DEFAULT 'pending',
    upstream_order_id BIGINT,
    start_count       BIGINT,
    current_count     BIGINT       NOT NULL DEFAULT 0,
    remains           BIGINT,
    upstream_status   VARCHAR(64),
    refunded_amount   NUMERIC      NOT NULL DEFAULT 0,
    completion_date   TIMESTAMPTZ,
    notes             TEXT,
    version           BIGINT       NOT NULL DEFAULT 0,
    created_at        TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    updated_at        TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    CONSTRAINT orders_quantity_positive CHECK (quantity > 0),
    CONSTRAINT orders_status_valid
        CHECK (status IN ('pending', 'in_progress', 'completed', 'cancelled', 'refunded'))
)
"#;

pub const CREATE_ORDERS_UPSTREAM_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS orders_provider_upstream_uq
    ON orders (provider, upstream_order_id)
    WHERE upstream_order_id IS NOT NULL
"#;

pub const CREATE_ORDERS_USER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS orders_user_created_idx ON orders (user_id, created_at DESC)
"#;

pub const CREATE_ORDERS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS orders_status_idx ON orders (status)
"#;

// Money columns are unconstrained NUMERIC so charges keep every digit.
// These widen tables created with a fixed scale.
pub const WIDEN_USER_MONEY: &str = r#"
ALTER TABLE users ALTER COLUMN balance TYPE NUMERIC
"#;

pub const WIDEN_ORDER_MONEY: &str = r#"
ALTER TABLE orders
    ALTER COLUMN total_price TYPE NUMERIC,
    ALTER COLUMN refunded_amount TYPE NUMERIC
"#;

pub const STATEMENTS: &[&str] = &[
    CREATE_USERS,
    CREATE_ORDERS,
    WIDEN_USER_MONEY,
    WIDEN_ORDER_MONEY,
    CREATE_ORDERS_UPSTREAM_INDEX,
    CREATE_ORDERS_USER_INDEX,
    CREATE_ORDERS_STATUS_INDEX,
];
