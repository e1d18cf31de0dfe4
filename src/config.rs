use std::net::SocketAddr;

use anyhow::Context;

const DEFAULT_DATABASE_URL: &str = "sqlite://movies.db?mode=rwc";

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub seed_data: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => match std::env::var("DATABASE") {
                Ok(name) => {
                    let user = std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
                    let password = std::env::var("PASSWORD").unwrap_or_default();
                    let db_host =
                        std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                    let db_port: u16 = std::env::var("DB_PORT")
                        .unwrap_or_else(|_| "5432".to_string())
                        .parse()
                        .context("DB_PORT")?;
                    postgres_url(&user, &password, &db_host, db_port, &name)
                }
                Err(_) => DEFAULT_DATABASE_URL.to_string(),
            },
        };

        let seed_data = match std::env::var("SEED_DATA") {
            Ok(raw) => parse_flag(&raw).with_context(|| format!("SEED_DATA={raw:?}"))?,
            Err(_) => true,
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            seed_data,
        })
    }
}

fn postgres_url(user: &str, password: &str, host: &str, port: u16, database: &str) -> String {
    let user = urlencoding::encode(user);
    if password.is_empty() {
        format!("postgres://{user}@{host}:{port}/{database}")
    } else {
        let password = urlencoding::encode(password);
        format!("postgres://{user}:{password}@{host}:{port}/{database}")
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("expected a boolean flag"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_url_escapes_password() {
        let url = postgres_url("postgres", "p@ss/word", "db", 5432, "movies");
        assert_eq!(url, "postgres://postgres:p%40ss%2Fword@db:5432/movies");
    }

    #[test]
    fn postgres_url_without_password() {
        let url = postgres_url("postgres", "", "localhost", 5433, "movies");
        assert_eq!(url, "postgres://postgres@localhost:5433/movies");
    }

    #[test]
    fn flags() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" yes ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
