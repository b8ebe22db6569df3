// src/vendas/vendas_store_mem.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use super::vendas_store::{ErroStore, Oferta, VendaStore, VendaTx};
use super::vendas_structs::{ItemVenda, RegistroVenda, StatusVenda, Venda};

#[derive(Clone)]
struct OfertaRegistrada {
    evento_id: Uuid,
    nome_produto: String,
    preco: BigDecimal,
    estoque: i32,
}

#[derive(Default)]
struct Dados {
    eventos: HashMap<Uuid, String>,
    ofertas: HashMap<Uuid, OfertaRegistrada>,
    vendas: Vec<Venda>,
}

/// Armazenamento de vendas em memória, usado nos testes no lugar do
/// PostgreSQL. As leituras enxergam o estado corrente; as escritas ficam
/// represadas na transação e só são aplicadas em `confirmar`, que re-valida
/// os decrementos contra o estado corrente e aplica tudo de uma vez.
/// Descartar a transação sem confirmar não deixa efeito nenhum.
#[derive(Clone, Default)]
pub struct MemVendaStore {
    dados: Arc<Mutex<Dados>>,
    transacoes: Arc<AtomicU32>,
}

impl MemVendaStore {
    pub fn nova() -> Self {
        MemVendaStore::default()
    }

    pub fn novo_evento(&self, nome: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.dados
            .lock()
            .unwrap()
            .eventos
            .insert(id, nome.to_string());
        id
    }

    pub fn nova_oferta(
        &self,
        evento_id: Uuid,
        nome_produto: &str,
        preco: &str,
        estoque: i32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.dados.lock().unwrap().ofertas.insert(
            id,
            OfertaRegistrada {
                evento_id,
                nome_produto: nome_produto.to_string(),
                preco: preco.parse().unwrap(),
                estoque,
            },
        );
        id
    }

    /// Simula uma edição administrativa de preço no meio de uma venda.
    pub fn definir_preco(&self, oferta_id: Uuid, novo_preco: &str) {
        if let Some(oferta) = self.dados.lock().unwrap().ofertas.get_mut(&oferta_id) {
            oferta.preco = novo_preco.parse().unwrap();
        }
    }

    pub fn estoque_de(&self, oferta_id: Uuid) -> i32 {
        self.dados
            .lock()
            .unwrap()
            .ofertas
            .get(&oferta_id)
            .map(|oferta| oferta.estoque)
            .unwrap_or(0)
    }

    pub fn vendas_registradas(&self) -> Vec<Venda> {
        self.dados.lock().unwrap().vendas.clone()
    }

    /// Quantas transações já foram abertas neste armazenamento.
    pub fn transacoes_iniciadas(&self) -> u32 {
        self.transacoes.load(Ordering::SeqCst)
    }
}

pub struct MemVendaTx {
    dados: Arc<Mutex<Dados>>,
    decrementos: Vec<(Uuid, i32)>,
    venda: Option<Venda>,
}

#[async_trait]
impl VendaStore for MemVendaStore {
    type Tx = MemVendaTx;

    async fn iniciar(&self) -> Result<MemVendaTx, ErroStore> {
        self.transacoes.fetch_add(1, Ordering::SeqCst);
        Ok(MemVendaTx {
            dados: Arc::clone(&self.dados),
            decrementos: Vec::new(),
            venda: None,
        })
    }
}

#[async_trait]
impl VendaTx for MemVendaTx {
    async fn evento_existe(&mut self, evento_id: Uuid) -> Result<bool, ErroStore> {
        Ok(self.dados.lock().unwrap().eventos.contains_key(&evento_id))
    }

    async fn travar_oferta(&mut self, oferta_id: Uuid) -> Result<Option<Oferta>, ErroStore> {
        Ok(self
            .dados
            .lock()
            .unwrap()
            .ofertas
            .get(&oferta_id)
            .map(|oferta| Oferta {
                evento_id: oferta.evento_id,
                nome_produto: oferta.nome_produto.clone(),
                preco: oferta.preco.clone(),
                estoque: oferta.estoque,
            }))
    }

    async fn inserir_venda(&mut self, registro: &RegistroVenda) -> Result<Venda, ErroStore> {
        let venda = Venda {
            id: Uuid::new_v4(),
            evento_id: registro.evento_id,
            data_hora: Utc::now(),
            valor_total: registro.valor_total.clone(),
            forma_pagamento: registro.forma_pagamento,
            status: StatusVenda::Concluida,
            itens: registro
                .itens
                .iter()
                .map(|item| ItemVenda {
                    id: Uuid::new_v4(),
                    produto_evento_id: item.produto_evento_id,
                    quantidade: item.quantidade,
                    preco_unitario: item.preco_unitario.clone(),
                })
                .collect(),
        };
        self.venda = Some(venda.clone());
        Ok(venda)
    }

    async fn decrementar_estoque(
        &mut self,
        oferta_id: Uuid,
        quantidade: i32,
    ) -> Result<i32, ErroStore> {
        let atual = self
            .dados
            .lock()
            .unwrap()
            .ofertas
            .get(&oferta_id)
            .map(|oferta| oferta.estoque)
            .unwrap_or(0);

        // Desconta o que esta mesma transação já represou para a oferta.
        let represado: i32 = self
            .decrementos
            .iter()
            .filter(|(id, _)| *id == oferta_id)
            .map(|(_, qtd)| *qtd)
            .sum();
        let disponivel = atual - represado;

        if disponivel < quantidade {
            return Err(ErroStore::EstoqueInsuficiente {
                oferta_id,
                disponivel,
                solicitado: quantidade,
            });
        }

        self.decrementos.push((oferta_id, quantidade));
        Ok(disponivel - quantidade)
    }

    async fn confirmar(self) -> Result<(), ErroStore> {
        let mut dados = self.dados.lock().unwrap();

        let mut somas: HashMap<Uuid, i32> = HashMap::new();
        for (oferta_id, quantidade) in &self.decrementos {
            *somas.entry(*oferta_id).or_insert(0) += quantidade;
        }

        // Re-valida tudo antes de aplicar qualquer coisa: ou a venda inteira
        // entra, ou nada muda.
        for (oferta_id, total) in &somas {
            let atual = dados
                .ofertas
                .get(oferta_id)
                .map(|oferta| oferta.estoque)
                .unwrap_or(0);
            if atual < *total {
                return Err(ErroStore::EstoqueInsuficiente {
                    oferta_id: *oferta_id,
                    disponivel: atual,
                    solicitado: *total,
                });
            }
        }

        for (oferta_id, total) in somas {
            if let Some(oferta) = dados.ofertas.get_mut(&oferta_id) {
                oferta.estoque -= total;
            }
        }

        if let Some(venda) = self.venda {
            dados.vendas.push(venda);
        }

        Ok(())
    }
}

/// Envolve um `MemVendaStore` e faz as primeiras N transações falharem na
/// confirmação com `Conflito`, para exercitar a re-tentativa do caixa.
pub struct StoreConflitante {
    interno: MemVendaStore,
    conflitos_restantes: AtomicU32,
}

impl StoreConflitante {
    pub fn nova(interno: MemVendaStore, conflitos: u32) -> Self {
        StoreConflitante {
            interno,
            conflitos_restantes: AtomicU32::new(conflitos),
        }
    }
}

pub struct TxConflitante {
    interna: MemVendaTx,
    falhar: bool,
}

#[async_trait]
impl VendaStore for StoreConflitante {
    type Tx = TxConflitante;

    async fn iniciar(&self) -> Result<TxConflitante, ErroStore> {
        let falhar = self
            .conflitos_restantes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(TxConflitante {
            interna: self.interno.iniciar().await?,
            falhar,
        })
    }
}

#[async_trait]
impl VendaTx for TxConflitante {
    async fn evento_existe(&mut self, evento_id: Uuid) -> Result<bool, ErroStore> {
        self.interna.evento_existe(evento_id).await
    }

    async fn travar_oferta(&mut self, oferta_id: Uuid) -> Result<Option<Oferta>, ErroStore> {
        self.interna.travar_oferta(oferta_id).await
    }

    async fn inserir_venda(&mut self, registro: &RegistroVenda) -> Result<Venda, ErroStore> {
        self.interna.inserir_venda(registro).await
    }

    async fn decrementar_estoque(
        &mut self,
        oferta_id: Uuid,
        quantidade: i32,
    ) -> Result<i32, ErroStore> {
        self.interna.decrementar_estoque(oferta_id, quantidade).await
    }

    async fn confirmar(self) -> Result<(), ErroStore> {
        if self.falhar {
            return Err(ErroStore::Conflito);
        }
        self.interna.confirmar().await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use crate::vendas::vendas_store::{ErroStore, VendaStore, VendaTx};
    use crate::vendas::vendas_structs::{FormaPagamento, RegistroItem, RegistroVenda};

    use super::MemVendaStore;

    fn preco(valor: &str) -> BigDecimal {
        BigDecimal::from_str(valor).unwrap()
    }

    fn registro_de(
        evento_id: Uuid,
        itens: &[(Uuid, i32, &str)],
        valor_total: &str,
    ) -> RegistroVenda {
        RegistroVenda {
            evento_id,
            forma_pagamento: FormaPagamento::Dinheiro,
            valor_total: preco(valor_total),
            itens: itens
                .iter()
                .map(|(id, qtd, unitario)| RegistroItem {
                    produto_evento_id: *id,
                    quantidade: *qtd,
                    preco_unitario: preco(unitario),
                })
                .collect(),
        }
    }

    #[actix_web::test]
    async fn transacao_descartada_nao_deixa_efeito_nenhum() {
        let store = MemVendaStore::nova();
        let evento = store.novo_evento("Quermesse de São João");
        let pastel = store.nova_oferta(evento, "Pastel", "5.00", 10);
        let caldo = store.nova_oferta(evento, "Caldo de cana", "7.00", 1);

        let mut tx = store.iniciar().await.unwrap();
        let registro = registro_de(evento, &[(pastel, 1, "5.00"), (caldo, 5, "7.00")], "40.00");
        tx.inserir_venda(&registro).await.unwrap();
        tx.decrementar_estoque(pastel, 1).await.unwrap();

        // O caldo só tem 1 unidade: o decremento de 5 é rejeitado na hora.
        let erro = tx.decrementar_estoque(caldo, 5).await.unwrap_err();
        assert!(matches!(
            erro,
            ErroStore::EstoqueInsuficiente {
                disponivel: 1,
                solicitado: 5,
                ..
            }
        ));

        // Descarta a transação sem confirmar: nada pode ter mudado.
        drop(tx);
        assert_eq!(store.estoque_de(pastel), 10);
        assert_eq!(store.estoque_de(caldo), 1);
        assert!(store.vendas_registradas().is_empty());
    }

    #[actix_web::test]
    async fn confirmacao_revalida_o_estoque_contra_o_estado_corrente() {
        let store = MemVendaStore::nova();
        let evento = store.novo_evento("Festa Junina");
        let pipoca = store.nova_oferta(evento, "Pipoca", "4.00", 1);

        // Duas transações enxergam a última unidade ao mesmo tempo.
        let mut tx1 = store.iniciar().await.unwrap();
        let mut tx2 = store.iniciar().await.unwrap();

        tx1.inserir_venda(&registro_de(evento, &[(pipoca, 1, "4.00")], "4.00"))
            .await
            .unwrap();
        tx1.decrementar_estoque(pipoca, 1).await.unwrap();

        tx2.inserir_venda(&registro_de(evento, &[(pipoca, 1, "4.00")], "4.00"))
            .await
            .unwrap();
        tx2.decrementar_estoque(pipoca, 1).await.unwrap();

        // A primeira confirmação leva a unidade; a segunda é rejeitada na
        // re-validação, e não aplica nada.
        tx1.confirmar().await.unwrap();
        let erro = tx2.confirmar().await.unwrap_err();

        assert!(matches!(
            erro,
            ErroStore::EstoqueInsuficiente {
                disponivel: 0,
                solicitado: 1,
                ..
            }
        ));
        assert_eq!(store.estoque_de(pipoca), 0);
        assert_eq!(store.vendas_registradas().len(), 1);
    }

    #[actix_web::test]
    async fn decrementos_repetidos_da_mesma_oferta_contam_juntos() {
        let store = MemVendaStore::nova();
        let evento = store.novo_evento("Festa Junina");
        let quentao = store.nova_oferta(evento, "Quentão", "6.00", 3);

        let mut tx = store.iniciar().await.unwrap();
        tx.decrementar_estoque(quentao, 2).await.unwrap();

        // Já há 2 unidades represadas nesta transação: só resta 1.
        let erro = tx.decrementar_estoque(quentao, 2).await.unwrap_err();
        assert!(matches!(
            erro,
            ErroStore::EstoqueInsuficiente {
                disponivel: 1,
                solicitado: 2,
                ..
            }
        ));
    }

    #[actix_web::test]
    async fn preco_capturado_nao_muda_com_edicao_posterior() {
        let store = MemVendaStore::nova();
        let evento = store.novo_evento("Festa Junina");
        let canjica = store.nova_oferta(evento, "Canjica", "5.00", 10);

        let mut tx = store.iniciar().await.unwrap();
        let oferta = tx.travar_oferta(canjica).await.unwrap().unwrap();
        assert_eq!(oferta.preco, preco("5.00"));

        // Edição administrativa entre a leitura e a confirmação.
        store.definir_preco(canjica, "8.00");

        let registro = registro_de(evento, &[(canjica, 1, "5.00")], "5.00");
        let venda = tx.inserir_venda(&registro).await.unwrap();
        tx.decrementar_estoque(canjica, 1).await.unwrap();
        tx.confirmar().await.unwrap();

        assert_eq!(venda.itens[0].preco_unitario, preco("5.00"));
        let registrada = &store.vendas_registradas()[0];
        assert_eq!(registrada.itens[0].preco_unitario, preco("5.00"));
        assert_eq!(registrada.valor_total, preco("5.00"));
    }
}
