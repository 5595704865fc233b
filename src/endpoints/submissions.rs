//! Code submissions.

// self
use crate::{_prelude::*, client::ApiClient, http::HttpTransport};

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// `POST /submissions`
	pub async fn submit_code<R, B>(&self, submission: &B) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.post("/submissions", submission).await
	}

	/// `GET /submissions/{id}/status`
	pub async fn submission_status<R>(&self, submission_id: u64) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.get(&format!("/submissions/{submission_id}/status")).await
	}
}
