//! Student analytics and leaderboards.

// self
use crate::{
	_prelude::*,
	client::{ApiClient, RequestOptions},
	http::{HttpTransport, Method},
};

/// CSV export downloaded from the analytics endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct CsvDownload {
	/// Suggested file name, `student_<id>_analytics.csv`.
	pub file_name: String,
	/// Raw CSV bytes.
	pub bytes: Vec<u8>,
}
impl Debug for CsvDownload {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CsvDownload")
			.field("file_name", &self.file_name)
			.field("len", &self.bytes.len())
			.finish()
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// `GET /analytics/students/{id}`
	pub async fn student_analytics<R>(&self, student_id: u64) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.get(&format!("/analytics/students/{student_id}")).await
	}

	/// `GET /analytics/students/{id}/csv`, returned as bytes.
	pub async fn student_analytics_csv(&self, student_id: u64) -> Result<CsvDownload, ApiError> {
		let options = RequestOptions::default().header("Accept", "text/csv");
		let response = self
			.send::<()>(Method::Get, &format!("/analytics/students/{student_id}/csv"), None, options)
			.await?;

		Ok(CsvDownload {
			file_name: format!("student_{student_id}_analytics.csv"),
			bytes: response.body,
		})
	}

	/// `GET /analytics/leaderboard`, optionally filtered by problem.
	pub async fn leaderboard<R>(&self, problem_id: Option<u64>) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		let mut options = RequestOptions::default();

		if let Some(problem_id) = problem_id {
			options = options.query("problemId", problem_id.to_string());
		}

		self.request::<R, ()>(Method::Get, "/analytics/leaderboard", None, options).await
	}
}
