//! User profile captured at login and the platform's role enumeration.

// self
use crate::_prelude::*;

/// Platform role. Serialized as its numeric wire code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum UserRole {
	/// Browses problems and submits code.
	Student,
	/// Grades submissions.
	Reviewer,
	/// Manages problems and users.
	Admin,
}
impl UserRole {
	/// Returns the role's display label.
	pub const fn as_str(self) -> &'static str {
		match self {
			UserRole::Student => "Student",
			UserRole::Reviewer => "Reviewer",
			UserRole::Admin => "Admin",
		}
	}

	/// Parses a role label case-insensitively.
	pub fn from_label(label: &str) -> Option<Self> {
		[UserRole::Student, UserRole::Reviewer, UserRole::Admin]
			.into_iter()
			.find(|role| role.as_str().eq_ignore_ascii_case(label.trim()))
	}
}
impl From<UserRole> for u8 {
	fn from(role: UserRole) -> Self {
		match role {
			UserRole::Student => 0,
			UserRole::Reviewer => 1,
			UserRole::Admin => 2,
		}
	}
}
impl TryFrom<u8> for UserRole {
	type Error = UnknownRole;

	fn try_from(code: u8) -> Result<Self, Self::Error> {
		match code {
			0 => Ok(UserRole::Student),
			1 => Ok(UserRole::Reviewer),
			2 => Ok(UserRole::Admin),
			other => Err(UnknownRole(other)),
		}
	}
}
impl Display for UserRole {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Raised when a numeric role code is outside the known range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown role code {0}.")]
pub struct UnknownRole(pub u8);

/// Profile of the signed-in user, persisted next to the credential pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	/// Backend identifier, or a `temp-` placeholder when the backend omitted it.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Email address.
	pub email: String,
	/// Role label as reported by the backend.
	pub role: String,
	/// Optional avatar URL.
	pub profile_image_url: Option<String>,
	/// Whether onboarding has been completed.
	pub is_profile_complete: bool,
	/// Account creation timestamp (RFC 3339).
	pub created_at: String,
}
impl UserProfile {
	/// Returns the parsed role, if the label matches a known one.
	pub fn role_kind(&self) -> Option<UserRole> {
		UserRole::from_label(&self.role)
	}

	/// Returns `true` when the id was synthesized locally.
	pub fn has_temporary_id(&self) -> bool {
		self.id.starts_with("temp-")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn role_serializes_as_numeric_code() {
		let payload =
			serde_json::to_string(&UserRole::Reviewer).expect("Role should serialize to JSON.");

		assert_eq!(payload, "1");

		let parsed: UserRole =
			serde_json::from_str("2").expect("Known role code should deserialize.");

		assert_eq!(parsed, UserRole::Admin);
		assert!(serde_json::from_str::<UserRole>("7").is_err());
	}

	#[test]
	fn role_labels_parse_case_insensitively() {
		assert_eq!(UserRole::from_label("admin"), Some(UserRole::Admin));
		assert_eq!(UserRole::from_label(" Student "), Some(UserRole::Student));
		assert_eq!(UserRole::from_label("user"), None);
	}
}
