// src/vendas/vendas_structs.rs

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Formas de pagamento aceitas no caixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormaPagamento {
    Dinheiro,
    Cartao,
    Pix,
}

impl FormaPagamento {
    /// Interpreta o texto recebido no pedido. A validação acontece aqui, e não
    /// na desserialização, para que um evento inexistente seja apontado antes
    /// de uma forma de pagamento desconhecida.
    pub fn interpretar(valor: &str) -> Option<FormaPagamento> {
        match valor {
            "dinheiro" => Some(FormaPagamento::Dinheiro),
            "cartao" => Some(FormaPagamento::Cartao),
            "pix" => Some(FormaPagamento::Pix),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormaPagamento::Dinheiro => "dinheiro",
            FormaPagamento::Cartao => "cartao",
            FormaPagamento::Pix => "pix",
        }
    }
}

/// Situação de uma venda registrada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVenda {
    Concluida,
    Cancelada,
}

impl StatusVenda {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusVenda::Concluida => "concluida",
            StatusVenda::Cancelada => "cancelada",
        }
    }
}

/// Um item do carrinho enviado pelo caixa.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPedido {
    pub produto_evento_id: Uuid,
    pub quantidade: i32,
}

/// Pedido de venda recebido no fechamento do carrinho. A forma de pagamento
/// chega como texto cru e é validada pelo caixa, na ordem certa.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovaVendaRequest {
    pub evento_id: Uuid,
    pub forma_pagamento: String,
    pub itens: Vec<ItemPedido>,
}

/// Linha já validada e precificada, pronta para o registro atômico.
#[derive(Debug, Clone)]
pub struct RegistroItem {
    pub produto_evento_id: Uuid,
    pub quantidade: i32,
    pub preco_unitario: BigDecimal,
}

/// Venda validada e precificada que o armazenamento persiste de uma vez.
#[derive(Debug, Clone)]
pub struct RegistroVenda {
    pub evento_id: Uuid,
    pub forma_pagamento: FormaPagamento,
    pub valor_total: BigDecimal,
    pub itens: Vec<RegistroItem>,
}

/// Item de uma venda registrada, com o preço unitário capturado no momento
/// da venda.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVenda {
    pub id: Uuid,
    pub produto_evento_id: Uuid,
    pub quantidade: i32,
    pub preco_unitario: BigDecimal,
}

/// Venda registrada, devolvida ao caixa para a emissão do cupom.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Venda {
    pub id: Uuid,
    pub evento_id: Uuid,
    pub data_hora: DateTime<Utc>,
    pub valor_total: BigDecimal,
    pub forma_pagamento: FormaPagamento,
    pub status: StatusVenda,
    pub itens: Vec<ItemVenda>,
}

/// Linha da listagem de vendas, sem os itens.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VendaResumo {
    pub id: Uuid,
    pub evento_id: Uuid,
    pub data_hora: DateTime<Utc>,
    pub valor_total: BigDecimal,
    pub forma_pagamento: String,
    pub status: String,
}

/// Filtros aceitos na listagem de vendas.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltroVendas {
    pub evento_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Detalhe completo de uma venda, no formato que o cupom consome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendaDetalhe {
    pub id: Uuid,
    pub data_hora: DateTime<Utc>,
    pub valor_total: BigDecimal,
    pub forma_pagamento: String,
    pub status: String,
    pub evento: EventoResumo,
    pub itens: Vec<ItemDetalhe>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventoResumo {
    pub id: Uuid,
    pub nome: String,
}

/// Item do detalhe da venda, com o produto descrito para impressão.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetalhe {
    pub id: Uuid,
    pub quantidade: i32,
    pub preco_unitario: BigDecimal,
    pub subtotal: BigDecimal,
    pub produto: ProdutoResumo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProdutoResumo {
    pub id: Uuid,
    pub nome: String,
    pub descricao: Option<String>,
    pub categoria: String,
}

/// Linha crua da consulta de itens do detalhe, antes da montagem aninhada.
#[derive(Debug, FromRow)]
pub struct ItemDetalheRow {
    pub id: Uuid,
    pub quantidade: i32,
    pub preco_unitario: BigDecimal,
    pub produto_id: Uuid,
    pub nome_produto: String,
    pub descricao_produto: Option<String>,
    pub categoria_nome: String,
}
