use crate::{error::ApiError, models::GenerateRequest, services::RecommendationService};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/generate-response").route(web::post().to(generate_response)));
}

/// Answer one conversational turn with assistant text and cited products
pub async fn generate_response(
    request: Json<GenerateRequest>,
    recommendation_service: web::Data<RecommendationService>,
) -> Result<HttpResponse, ApiError> {
    let response = recommendation_service.generate(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}
