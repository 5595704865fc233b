//! Problem catalog and admin problem management.

// crates.io
use futures::future;
// self
use crate::{
	_prelude::*,
	client::ApiClient,
	http::{HttpTransport, Method},
};

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// `GET /problems`
	pub async fn problems<R>(&self) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.get("/problems").await
	}

	/// `GET /problems/{id}`
	pub async fn problem<R>(&self, id: u64) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.get(&format!("/problems/{id}")).await
	}

	/// `GET /admin/problems`
	pub async fn admin_problems<R>(&self) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.get("/admin/problems").await
	}

	/// `POST /admin/problems`
	pub async fn create_problem<R, B>(&self, body: &B) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.post("/admin/problems", body).await
	}

	/// `PUT /admin/problems/{id}`
	pub async fn update_problem<R, B>(&self, id: u64, body: &B) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.put(&format!("/admin/problems/{id}"), body).await
	}

	/// `DELETE /admin/problems/{id}`
	pub async fn delete_problem(&self, id: u64) -> Result<(), ApiError> {
		self.send::<()>(Method::Delete, &format!("/admin/problems/{id}"), None, Default::default())
			.await
			.map(|_| ())
	}

	/// Deletes every id concurrently and reports each outcome in input order.
	pub async fn delete_problems(&self, ids: &[u64]) -> Vec<(u64, Result<(), ApiError>)> {
		let outcomes = future::join_all(ids.iter().map(|id| self.delete_problem(*id))).await;

		ids.iter().copied().zip(outcomes).collect()
	}
}
