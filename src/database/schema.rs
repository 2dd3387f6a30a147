/// Baseline schema, executed on every startup. A fresh database comes out of
/// this complete; an existing database is only extended by the reconciler,
/// never rewritten.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = 1;

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    login_code TEXT UNIQUE,
    phone TEXT,
    image_path TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS instructors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    login_code TEXT UNIQUE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY,
    player_id INTEGER NOT NULL,
    metric TEXT,
    value REAL,
    unit TEXT,
    recorded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    source TEXT,
    entered_by_instructor_id INTEGER,
    note TEXT,
    FOREIGN KEY (player_id) REFERENCES players (id) ON DELETE CASCADE,
    FOREIGN KEY (entered_by_instructor_id) REFERENCES instructors (id)
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY,
    player_id INTEGER NOT NULL,
    instructor_id INTEGER,
    text TEXT NOT NULL,
    shared BOOLEAN NOT NULL DEFAULT TRUE,
    kind TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (player_id) REFERENCES players (id) ON DELETE CASCADE,
    FOREIGN KEY (instructor_id) REFERENCES instructors (id)
);

CREATE TABLE IF NOT EXISTS drills (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    video_url TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS drill_assignments (
    id INTEGER PRIMARY KEY,
    player_id INTEGER NOT NULL,
    instructor_id INTEGER,
    drill_id INTEGER,
    note TEXT,
    status TEXT DEFAULT 'assigned',
    due_date TIMESTAMP,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (player_id) REFERENCES players (id) ON DELETE CASCADE,
    FOREIGN KEY (instructor_id) REFERENCES instructors (id),
    FOREIGN KEY (drill_id) REFERENCES drills (id)
);

CREATE TABLE IF NOT EXISTS favorites (
    id INTEGER PRIMARY KEY,
    instructor_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (instructor_id, player_id),
    FOREIGN KEY (instructor_id) REFERENCES instructors (id) ON DELETE CASCADE,
    FOREIGN KEY (player_id) REFERENCES players (id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS reference_ranges (
    id INTEGER PRIMARY KEY,
    age_bucket TEXT NOT NULL,
    metric TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT,
    UNIQUE (age_bucket, metric)
);
"#;

/// Created after column patching: on a legacy database the indexed columns may
/// not exist until the reconciler has added them.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS ix_metrics_player_metric_time ON metrics (player_id, metric, recorded_at)",
    "CREATE INDEX IF NOT EXISTS ix_drill_assign_player_status ON drill_assignments (player_id, status)",
];

/// A table the application relies on, with the columns that must exist beyond
/// whatever an older deployment created. Missing columns are added nullable
/// and without defaults so historical rows are left exactly as they were.
pub struct TableSpec {
    pub name: &'static str,
    pub required_columns: &'static [(&'static str, &'static str)],
}

pub const EXPECTED_TABLES: &[TableSpec] = &[
    TableSpec {
        name: "players",
        required_columns: &[
            ("age", "INTEGER"),
            ("login_code", "TEXT"),
            ("phone", "TEXT"),
            ("image_path", "TEXT"),
            ("created_at", "TIMESTAMP"),
            ("updated_at", "TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "instructors",
        required_columns: &[
            ("login_code", "TEXT"),
            ("created_at", "TIMESTAMP"),
            ("updated_at", "TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "metrics",
        required_columns: &[
            ("metric", "TEXT"),
            ("value", "REAL"),
            ("unit", "TEXT"),
            ("recorded_at", "TIMESTAMP"),
            ("source", "TEXT"),
            ("entered_by_instructor_id", "INTEGER"),
            ("note", "TEXT"),
        ],
    },
    TableSpec {
        name: "notes",
        required_columns: &[
            ("instructor_id", "INTEGER"),
            ("shared", "BOOLEAN"),
            ("kind", "TEXT"),
            ("created_at", "TIMESTAMP"),
            ("updated_at", "TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "drills",
        required_columns: &[
            ("description", "TEXT"),
            ("video_url", "TEXT"),
            ("created_at", "TIMESTAMP"),
            ("updated_at", "TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "drill_assignments",
        required_columns: &[
            ("instructor_id", "INTEGER"),
            ("drill_id", "INTEGER"),
            ("note", "TEXT"),
            ("status", "TEXT"),
            ("due_date", "TIMESTAMP"),
            ("created_at", "TIMESTAMP"),
            ("updated_at", "TIMESTAMP"),
        ],
    },
    TableSpec {
        name: "favorites",
        required_columns: &[("created_at", "TIMESTAMP")],
    },
    TableSpec {
        name: "reference_ranges",
        required_columns: &[("value", "REAL"), ("unit", "TEXT")],
    },
];
