//! Schema and workload SQL
//!
//! Both schemas drop `comments` before `posts` so the foreign key never
//! blocks the reset, then seed `posts(id=1, comments_count=0)`.

use crate::engine::Engine;

pub const MYSQL_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS comments;
    DROP TABLE IF EXISTS posts;
    CREATE TABLE posts (
      id             INT(11) NOT NULL AUTO_INCREMENT,
      comments_count INT(11) NOT NULL,
      PRIMARY KEY (id)
    );
    CREATE TABLE comments (
      id      INT(11) NOT NULL AUTO_INCREMENT,
      post_id INT(11) NOT NULL,
      PRIMARY KEY (id),
      FOREIGN KEY (post_id) REFERENCES posts(id)
    );
    INSERT INTO posts (id, comments_count) VALUES (1, 0);
"#;

pub const POSTGRES_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS comments;
    DROP TABLE IF EXISTS posts;
    CREATE TABLE posts (
      id             serial PRIMARY KEY,
      comments_count integer
    );
    CREATE TABLE comments (
      id      serial PRIMARY KEY,
      post_id integer REFERENCES posts
    );
    INSERT INTO posts (id, comments_count) VALUES (1, 0);
"#;

/// Transaction every worker runs. The insert takes a shared lock on the
/// parent row through the foreign key; the update then needs an exclusive one.
pub const DEADLOCKING_STATEMENT: &str = r#"
    BEGIN;
    INSERT INTO comments (post_id) VALUES (1);
    UPDATE posts SET comments_count = comments_count + 1 WHERE id = 1;
    COMMIT;
"#;

/// DDL for the given engine
pub fn for_engine(engine: Engine) -> &'static str {
    match engine {
        Engine::MySql => MYSQL_SCHEMA,
        Engine::Postgres => POSTGRES_SCHEMA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::split_fragments;

    #[test]
    fn schemas_drop_child_before_parent() {
        for engine in [Engine::MySql, Engine::Postgres] {
            let fragments: Vec<_> = split_fragments(for_engine(engine)).collect();
            assert_eq!(fragments[0], "DROP TABLE IF EXISTS comments", "{engine}");
            assert_eq!(fragments[1], "DROP TABLE IF EXISTS posts", "{engine}");
        }
    }

    #[test]
    fn schemas_seed_exactly_one_post() {
        for engine in [Engine::MySql, Engine::Postgres] {
            let seeds = split_fragments(for_engine(engine))
                .filter(|f| f.starts_with("INSERT"))
                .collect::<Vec<_>>();
            assert_eq!(
                seeds,
                vec!["INSERT INTO posts (id, comments_count) VALUES (1, 0)"]
            );
        }
    }

    #[test]
    fn deadlocking_statement_is_one_transaction() {
        let fragments: Vec<_> = split_fragments(DEADLOCKING_STATEMENT).collect();
        assert_eq!(fragments.len(), 4);
        assert_eq!(fragments.first(), Some(&"BEGIN"));
        assert_eq!(fragments.last(), Some(&"COMMIT"));
        assert!(fragments[1].starts_with("INSERT INTO comments"));
        assert!(fragments[2].contains("comments_count = comments_count + 1"));
    }
}
