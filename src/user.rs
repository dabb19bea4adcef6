//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A validated, non-empty username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Create a username, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyUsername] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyUsername)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a username without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A syntactically valid email address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let raw_email = raw_email.trim();

        if EmailAddress::is_valid(raw_email) {
            Ok(Self(raw_email.to_owned()))
        } else {
            Err(Error::InvalidEmail(raw_email.to_owned()))
        }
    }

    /// Create an email without validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted email address.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The gender chosen at sign up, used to pick the default avatar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// The string stored in the database and used in forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    /// The avatar assigned to new users of this gender.
    pub fn default_avatar(&self) -> &'static str {
        match self {
            Gender::Male => "/static/avatar_male.svg",
            Gender::Female => "/static/avatar_female.svg",
            Gender::Other => "/static/avatar_default.svg",
        }
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(Error::InvalidGender(other.to_owned())),
        }
    }
}

impl Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: Username,
    /// The user's email address.
    pub email: Email,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// A URL or path to the user's avatar image.
    pub avatar: String,
    /// The gender the user chose at sign up.
    pub gender: Gender,
    /// The balance as of the last change to the user's transactions.
    ///
    /// This is a cache. Use [crate::get_balance_summary] for the authoritative balance.
    pub balance: f64,
}

/// The data needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub gender: Gender,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                avatar TEXT NOT NULL,
                gender TEXT NOT NULL,
                balance REAL NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The avatar is derived from the user's gender.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateUsername] if the username is taken,
/// - [Error::DuplicateEmail] if the email is taken,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let avatar = new_user.gender.default_avatar();

    connection.execute(
        "INSERT INTO user (username, email, password, avatar, gender) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            new_user.username.as_ref(),
            new_user.email.as_ref(),
            new_user.password_hash.as_ref(),
            avatar,
            new_user.gender.as_str(),
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        avatar: avatar.to_owned(),
        gender: new_user.gender,
        balance: 0.0,
    })
}

const SELECT_USER: &str =
    "SELECT id, username, email, password, avatar, gender, balance FROM user";

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user with the username `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE username = :username"))?
        .query_row(&[(":username", &username)], map_user_row)
        .map_err(|error| error.into())
}

/// Whether a user other than `except` already has `username`.
pub fn username_taken(
    username: &Username,
    except: Option<UserID>,
    connection: &Connection,
) -> Result<bool, Error> {
    let except = except.map(|id| id.as_i64()).unwrap_or(0);

    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM user WHERE username = ?1 AND id != ?2)",
            (username.as_ref(), except),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Whether any user already has `email`.
pub fn email_taken(email: &Email, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM user WHERE email = ?1)",
            (email.as_ref(),),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Set the username and password hash of the user `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist or
/// [Error::DuplicateUsername] if the username belongs to another user.
pub fn update_profile(
    user_id: UserID,
    username: &Username,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET username = ?1, password = ?2 WHERE id = ?3",
        (username.as_ref(), password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Replace the password hash of the user `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn update_password_hash(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Store `balance` as the cached balance of the user `user_id`.
pub fn set_cached_balance(
    user_id: UserID,
    balance: f64,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE user SET balance = ?1 WHERE id = ?2",
        (balance, user_id.as_i64()),
    )?;

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let username = Username::new_unchecked(&row.get::<_, String>(1)?);
    let email = Email::new_unchecked(&row.get::<_, String>(2)?);
    let password_hash = PasswordHash::new_unchecked(&row.get::<_, String>(3)?);
    let avatar = row.get(4)?;
    let raw_gender: String = row.get(5)?;
    let gender = raw_gender.parse().unwrap_or(Gender::Other);
    let balance = row.get(6)?;

    Ok(User {
        id,
        username,
        email,
        password_hash,
        avatar,
        gender,
        balance,
    })
}
