use chrono::NaiveDate;

/// Fields supplied at registration. The password is plaintext here and is
/// hashed by the directory.
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub password: String,
}
