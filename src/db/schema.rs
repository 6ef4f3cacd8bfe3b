pub const SCHEMA: &str = r#"
-- submissions table: one row per unique share link
CREATE TABLE IF NOT EXISTS submissions (
    id TEXT PRIMARY KEY,
    source_url TEXT NOT NULL UNIQUE,
    submitter TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'scraped', 'error')),
    content TEXT,
    digest TEXT,
    created_at TEXT NOT NULL,
    scraped_at TEXT,
    shared_to_group_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_submissions_submitter ON submissions(submitter);
CREATE INDEX IF NOT EXISTS idx_submissions_created_at ON submissions(created_at);
CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(status);
"#;
