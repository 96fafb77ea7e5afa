//! SQL schema for the LabGuard SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Identity service tables.
CREATE TABLE IF NOT EXISTS accounts (
    id                 TEXT PRIMARY KEY,
    email              TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash      TEXT NOT NULL,   -- argon2 PHC string
    full_name          TEXT,
    email_confirmed_at TEXT,
    created_at         TEXT NOT NULL
);

-- Only a SHA-256 of each issued token is kept.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    account_id  TEXT NOT NULL REFERENCES accounts(id),
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS profiles (
    id          TEXT PRIMARY KEY,   -- = accounts.id
    full_name   TEXT,
    email       TEXT,
    role_id     TEXT REFERENCES roles(id),
    role        TEXT,               -- denormalised role slug
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS samples (
    id                      TEXT PRIMARY KEY,
    code                    TEXT,
    type                    TEXT NOT NULL,
    origin                  TEXT NOT NULL,
    transport_condition     TEXT NOT NULL,
    storage_condition       TEXT NOT NULL,
    business_name           TEXT NOT NULL,
    phone                   TEXT NOT NULL,
    address                 TEXT NOT NULL,
    status                  TEXT NOT NULL DEFAULT 'por_asignar'
                            CHECK (status IN ('por_asignar', 'esperando_analisis',
                                              'pendiente_validacion', 'evaluada')),
    received_at             TEXT,
    created_at              TEXT NOT NULL,
    assigned_analyst_id     TEXT,
    due_date                TEXT,   -- YYYY-MM-DD
    analysis_payload        TEXT,   -- JSON
    analysis_submitted_at   TEXT,
    validation_payload      TEXT,   -- JSON
    validation_submitted_at TEXT,
    evaluated_by            TEXT,
    created_by              TEXT,
    updated_by              TEXT,
    certification_status    TEXT
                            CHECK (certification_status IN ('recibida', 'rechazada'))
);

-- Per type-and-day counters behind sample codes.
CREATE TABLE IF NOT EXISTS sample_sequences (
    code_prefix TEXT PRIMARY KEY,   -- e.g. 'AGU-20261018'
    last_value  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS samples_status_idx   ON samples(status);
CREATE INDEX IF NOT EXISTS samples_received_idx ON samples(received_at);
CREATE INDEX IF NOT EXISTS profiles_role_idx    ON profiles(role_id);
CREATE INDEX IF NOT EXISTS sessions_account_idx ON sessions(account_id);

PRAGMA user_version = 1;
";

/// Built-in roles present in every store: `(slug, name, description)`.
pub const DEFAULT_ROLES: &[(&str, &str, &str)] = &[
  ("admin", "Administrador", "Gestiona usuarios y roles"),
  ("recepcion", "Recepción", "Registra las muestras recibidas"),
  ("analista", "Analista", "Analiza las muestras asignadas"),
  ("evaluador", "Evaluador", "Asigna, valida y certifica muestras"),
];
