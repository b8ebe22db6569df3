// src/vendas/vendas_store.rs

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use super::vendas_structs::{ItemVenda, RegistroVenda, StatusVenda, Venda};

/// Erros do armazenamento de vendas.
#[derive(Debug, Error)]
pub enum ErroStore {
    /// Conflito de escrita sinalizado pelo banco (falha de serialização ou
    /// deadlock). Pode ser tentado de novo em uma transação nova.
    #[error("conflito de escrita entre vendas concorrentes")]
    Conflito,

    /// O decremento re-validado deixaria o estoque negativo.
    #[error("estoque insuficiente para a oferta {oferta_id}: disponível {disponivel}, solicitado {solicitado}")]
    EstoqueInsuficiente {
        oferta_id: Uuid,
        disponivel: i32,
        solicitado: i32,
    },

    #[error("erro de banco de dados: {0}")]
    Banco(#[from] sqlx::Error),
}

/// Oferta de um produto em um evento, como lida (e travada) na transação.
#[derive(Debug, Clone, FromRow)]
pub struct Oferta {
    pub evento_id: Uuid,
    pub nome_produto: String,
    pub preco: BigDecimal,
    pub estoque: i32,
}

/// Abre a transação dentro da qual uma venda é validada e registrada.
#[async_trait]
pub trait VendaStore: Send + Sync {
    type Tx: VendaTx + Send;

    async fn iniciar(&self) -> Result<Self::Tx, ErroStore>;
}

/// Uma transação de venda. Todas as leituras e escritas de um registro de
/// venda acontecem por aqui; descartar a transação sem chamar `confirmar`
/// desfaz tudo o que foi feito nela.
#[async_trait]
pub trait VendaTx: Send {
    async fn evento_existe(&mut self, evento_id: Uuid) -> Result<bool, ErroStore>;

    /// Busca a oferta e a reserva até o fim da transação. `None` quando a
    /// oferta não existe.
    async fn travar_oferta(&mut self, oferta_id: Uuid) -> Result<Option<Oferta>, ErroStore>;

    /// Persiste a venda com os itens e devolve o registro completo.
    /// Deve ser chamada no máximo uma vez por transação.
    async fn inserir_venda(&mut self, registro: &RegistroVenda) -> Result<Venda, ErroStore>;

    /// Decrementa o estoque da oferta, re-validando contra o valor corrente,
    /// e devolve o estoque restante. Nunca deixa o estoque negativo.
    async fn decrementar_estoque(
        &mut self,
        oferta_id: Uuid,
        quantidade: i32,
    ) -> Result<i32, ErroStore>;

    async fn confirmar(self) -> Result<(), ErroStore>;
}

/// Classifica erros do PostgreSQL: falha de serialização (40001) e deadlock
/// (40P01) são conflitos que valem uma nova tentativa.
fn classificar(erro: sqlx::Error) -> ErroStore {
    if let sqlx::Error::Database(ref causa) = erro {
        if let Some(codigo) = causa.code() {
            if codigo == "40001" || codigo == "40P01" {
                return ErroStore::Conflito;
            }
        }
    }
    ErroStore::Banco(erro)
}

/// Armazenamento de vendas sobre o pool PostgreSQL da aplicação.
#[derive(Clone)]
pub struct PgVendaStore {
    pool: Pool<Postgres>,
}

impl PgVendaStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgVendaStore { pool }
    }
}

pub struct PgVendaTx {
    transaction: Transaction<'static, Postgres>,
}

#[async_trait]
impl VendaStore for PgVendaStore {
    type Tx = PgVendaTx;

    async fn iniciar(&self) -> Result<PgVendaTx, ErroStore> {
        let transaction = self.pool.begin().await.map_err(classificar)?;
        Ok(PgVendaTx { transaction })
    }
}

#[async_trait]
impl VendaTx for PgVendaTx {
    async fn evento_existe(&mut self, evento_id: Uuid) -> Result<bool, ErroStore> {
        let existe: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM eventos WHERE id = $1)")
                .bind(evento_id)
                .fetch_one(&mut *self.transaction)
                .await
                .map_err(classificar)?;
        Ok(existe.0)
    }

    async fn travar_oferta(&mut self, oferta_id: Uuid) -> Result<Option<Oferta>, ErroStore> {
        // FOR UPDATE bloqueia a linha da oferta até o fim da transação, para
        // que duas vendas do mesmo produto não leiam o mesmo estoque.
        sqlx::query_as::<_, Oferta>(
            "SELECT pe.evento_id, p.nome AS nome_produto, pe.preco, pe.estoque
             FROM produtos_evento pe
             JOIN produtos p ON p.id = pe.produto_id
             WHERE pe.id = $1
             FOR UPDATE OF pe",
        )
        .bind(oferta_id)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(classificar)
    }

    async fn inserir_venda(&mut self, registro: &RegistroVenda) -> Result<Venda, ErroStore> {
        let (venda_id, data_hora): (Uuid, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO vendas (evento_id, valor_total, forma_pagamento, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, data_hora",
        )
        .bind(registro.evento_id)
        .bind(&registro.valor_total)
        .bind(registro.forma_pagamento.as_str())
        .bind(StatusVenda::Concluida.as_str())
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(classificar)?;

        let mut itens = Vec::with_capacity(registro.itens.len());
        for item in &registro.itens {
            let (item_id,): (Uuid,) = sqlx::query_as(
                "INSERT INTO venda_itens (venda_id, produto_evento_id, quantidade, preco_unitario)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
            )
            .bind(venda_id)
            .bind(item.produto_evento_id)
            .bind(item.quantidade)
            .bind(&item.preco_unitario)
            .fetch_one(&mut *self.transaction)
            .await
            .map_err(classificar)?;

            itens.push(ItemVenda {
                id: item_id,
                produto_evento_id: item.produto_evento_id,
                quantidade: item.quantidade,
                preco_unitario: item.preco_unitario.clone(),
            });
        }

        Ok(Venda {
            id: venda_id,
            evento_id: registro.evento_id,
            data_hora,
            valor_total: registro.valor_total.clone(),
            forma_pagamento: registro.forma_pagamento,
            status: StatusVenda::Concluida,
            itens,
        })
    }

    async fn decrementar_estoque(
        &mut self,
        oferta_id: Uuid,
        quantidade: i32,
    ) -> Result<i32, ErroStore> {
        // O decremento re-valida o estoque na própria cláusula WHERE: se outra
        // transação consumiu as unidades nesse meio tempo, nenhuma linha é
        // atualizada e a venda é rejeitada, nunca deixando o estoque negativo.
        let restante: Option<(i32,)> = sqlx::query_as(
            "UPDATE produtos_evento
             SET estoque = estoque - $2
             WHERE id = $1 AND estoque >= $2
             RETURNING estoque",
        )
        .bind(oferta_id)
        .bind(quantidade)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(classificar)?;

        match restante {
            Some((estoque,)) => Ok(estoque),
            None => {
                // A guarda rejeitou o decremento: relê o estoque corrente
                // apenas para compor a mensagem da rejeição.
                let atual: Option<(i32,)> =
                    sqlx::query_as("SELECT estoque FROM produtos_evento WHERE id = $1")
                        .bind(oferta_id)
                        .fetch_optional(&mut *self.transaction)
                        .await
                        .map_err(classificar)?;

                Err(ErroStore::EstoqueInsuficiente {
                    oferta_id,
                    disponivel: atual.map(|(estoque,)| estoque).unwrap_or(0),
                    solicitado: quantidade,
                })
            }
        }
    }

    async fn confirmar(self) -> Result<(), ErroStore> {
        self.transaction.commit().await.map_err(classificar)
    }
}
