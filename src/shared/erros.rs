// src/shared/erros.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

use crate::vendas::vendas_store::ErroStore;

use super::shared_structs::GenericResponse;

/// Erros devolvidos pelas rotas da API. Cada variante carrega o contexto
/// necessário para o caixa entender o motivo exato da rejeição.
#[derive(Debug, Error)]
pub enum ErroApi {
    #[error("Evento não encontrado: {0}")]
    EventoNaoEncontrado(Uuid),

    #[error("Produto não encontrado no evento: {0}")]
    OfertaNaoEncontrada(Uuid),

    #[error("Venda não encontrada: {0}")]
    VendaNaoEncontrada(Uuid),

    #[error("Pedido inválido: {0}")]
    PedidoInvalido(String),

    #[error("Estoque insuficiente para o produto {oferta_id}: disponível {disponivel}, solicitado {solicitado}")]
    EstoqueInsuficiente {
        oferta_id: Uuid,
        disponivel: i32,
        solicitado: i32,
    },

    #[error("Erro interno ao processar a venda")]
    FalhaTransacao(#[source] ErroStore),
}

// Um estoque que se esgotou durante a transação é uma rejeição de negócio,
// igual à detectada na validação. O resto é falha de infraestrutura.
impl From<ErroStore> for ErroApi {
    fn from(erro: ErroStore) -> Self {
        match erro {
            ErroStore::EstoqueInsuficiente {
                oferta_id,
                disponivel,
                solicitado,
            } => ErroApi::EstoqueInsuficiente {
                oferta_id,
                disponivel,
                solicitado,
            },
            outro => ErroApi::FalhaTransacao(outro),
        }
    }
}

impl From<sqlx::Error> for ErroApi {
    fn from(erro: sqlx::Error) -> Self {
        ErroApi::FalhaTransacao(ErroStore::from(erro))
    }
}

impl ResponseError for ErroApi {
    fn status_code(&self) -> StatusCode {
        match self {
            ErroApi::EventoNaoEncontrado(_)
            | ErroApi::OfertaNaoEncontrada(_)
            | ErroApi::VendaNaoEncontrada(_) => StatusCode::NOT_FOUND,
            ErroApi::PedidoInvalido(_) | ErroApi::EstoqueInsuficiente { .. } => {
                StatusCode::BAD_REQUEST
            }
            ErroApi::FalhaTransacao(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ErroApi::FalhaTransacao(causa) = self {
            tracing::error!(causa = %causa, "falha ao atender a requisição");
        }
        HttpResponse::build(self.status_code()).json(GenericResponse::erro(self.to_string()))
    }
}
