//! Entity/relation graph built from model extractions.
//!
//! Nodes are keyed by entity name. The whole graph is written back to a
//! JSON snapshot after every mutation and reloaded on open.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use tokio::sync::{Mutex, RwLock};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Degradation, EdgeAttrs, EntityHit, Extraction, ExtractionOutcome, GraphConfig, GraphEdge,
    GraphNode, GraphSnapshot, GraphStats, GraphUpdate,
};
use crate::domain::ports::{GenerationOptions, TextGenerator};
use crate::domain::text::{token_set, truncate_chars};
use crate::services::call_guard::CallGuard;

const UNKNOWN_TYPE: &str = "unknown";

const EXTRACTION_PROMPT: &str = "Extract the named entities and the relations between them \
from the text below. Respond with a single JSON object and nothing else, shaped as:\n\
{\"entities\": [{\"name\": \"...\", \"type\": \"...\"}], \
\"relations\": [{\"source\": \"...\", \"target\": \"...\", \"relation\": \"...\"}]}\n\
Use the entity names exactly as they appear in the text.\n\nText:\n";

/// Graph plus the name index, always mutated together.
#[derive(Default)]
struct IndexedGraph {
    graph: StableDiGraph<GraphNode, EdgeAttrs>,
    by_name: HashMap<String, NodeIndex>,
}

impl IndexedGraph {
    fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut indexed = Self::default();
        for node in snapshot.nodes {
            indexed.upsert_node(&node.name, &node.entity_type, &node.source);
        }
        for edge in snapshot.edges {
            indexed.insert_edge(&edge.from, &edge.to, &edge.relation, &edge.source);
        }
        indexed
    }

    fn snapshot(&self) -> GraphSnapshot {
        let nodes = self.graph.node_indices().map(|i| self.graph[i].clone()).collect();
        let edges = self
            .graph
            .edge_references()
            .map(|e| GraphEdge {
                from: self.graph[e.source()].name.clone(),
                to: self.graph[e.target()].name.clone(),
                relation: e.weight().relation.clone(),
                source: e.weight().source.clone(),
            })
            .collect();
        GraphSnapshot { nodes, edges }
    }

    /// Returns the node and whether it was created.
    fn ensure_node(&mut self, name: &str, source: &str) -> (NodeIndex, bool) {
        if let Some(&idx) = self.by_name.get(name) {
            return (idx, false);
        }
        let idx = self.graph.add_node(GraphNode {
            name: name.to_string(),
            entity_type: UNKNOWN_TYPE.to_string(),
            source: source.to_string(),
        });
        self.by_name.insert(name.to_string(), idx);
        (idx, true)
    }

    /// Insert or refresh a node. Returns `(created, updated)`.
    fn upsert_node(&mut self, name: &str, entity_type: &str, source: &str) -> (bool, bool) {
        let (idx, created) = self.ensure_node(name, source);
        let node = &mut self.graph[idx];
        let mut updated = false;
        if entity_type != UNKNOWN_TYPE && node.entity_type != entity_type {
            node.entity_type = entity_type.to_string();
            updated = true;
        }
        if node.source != source {
            node.source = source.to_string();
            updated = true;
        }
        (created, updated && !created)
    }

    /// Add `from -[relation]-> to` unless that exact edge exists.
    /// Returns `(nodes_created, edge_added)`.
    fn insert_edge(&mut self, from: &str, to: &str, relation: &str, source: &str) -> (usize, bool) {
        let (a, created_a) = self.ensure_node(from, source);
        let (b, created_b) = self.ensure_node(to, source);
        let created = usize::from(created_a) + usize::from(created_b);

        let exists = self
            .graph
            .edges_directed(a, Direction::Outgoing)
            .any(|e| e.target() == b && e.weight().relation == relation);
        if exists {
            return (created, false);
        }
        self.graph.add_edge(
            a,
            b,
            EdgeAttrs {
                relation: relation.to_string(),
                source: source.to_string(),
            },
        );
        (created, true)
    }

    /// Seed entities for a query: names contained in the query or containing
    /// it, falling back to any shared word.
    fn seeds(&self, query: &str) -> Vec<NodeIndex> {
        let query_lower = query.to_lowercase();
        let exact: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&i| {
                let name = self.graph[i].name.to_lowercase();
                query_lower.contains(&name) || name.contains(&query_lower)
            })
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let query_words = token_set(query);
        self.graph
            .node_indices()
            .filter(|&i| !token_set(&self.graph[i].name).is_disjoint(&query_words))
            .collect()
    }

    /// Breadth-first over both edge directions, recording first-seen hop.
    fn traverse(&self, seeds: &[NodeIndex], max_hops: usize) -> Vec<(NodeIndex, usize)> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::new();
        let mut reached = Vec::new();

        for &seed in seeds {
            if visited.insert(seed) {
                queue.push_back((seed, 0));
            }
        }

        while let Some((idx, hop)) = queue.pop_front() {
            reached.push((idx, hop));
            if hop >= max_hops {
                continue;
            }
            for neighbor in self.graph.neighbors_undirected(idx) {
                if visited.insert(neighbor) {
                    queue.push_back((neighbor, hop + 1));
                }
            }
        }

        reached
    }
}

/// Parse an extraction reply, tolerating prose around the JSON object.
pub fn parse_extraction(reply: &str) -> Option<Extraction> {
    let trimmed = reply.trim();
    if let Ok(extraction) = serde_json::from_str::<Extraction>(trimmed) {
        return Some(extraction);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

pub struct KnowledgeGraph {
    config: GraphConfig,
    generator: Arc<dyn TextGenerator>,
    llm_guard: CallGuard,
    extraction_model: Option<String>,
    path: Option<PathBuf>,
    inner: RwLock<IndexedGraph>,
    persist_lock: Mutex<()>,
}

impl KnowledgeGraph {
    /// Open the graph, loading `path` if it exists. `None` keeps the graph
    /// in memory only.
    pub async fn open(
        config: GraphConfig,
        path: Option<PathBuf>,
        generator: Arc<dyn TextGenerator>,
        llm_guard: CallGuard,
    ) -> DomainResult<Self> {
        let snapshot = match &path {
            Some(path) => load_snapshot(path).await?,
            None => GraphSnapshot::default(),
        };
        let inner = IndexedGraph::from_snapshot(snapshot);
        tracing::info!(
            nodes = inner.graph.node_count(),
            edges = inner.graph.edge_count(),
            path = ?path,
            "knowledge graph opened"
        );

        Ok(Self {
            config,
            generator,
            llm_guard,
            extraction_model: None,
            path,
            inner: RwLock::new(inner),
            persist_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn with_extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = Some(model.into());
        self
    }

    pub const fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Ask the model for entities and relations. Never fails: unusable
    /// replies produce an empty extraction with the reason attached.
    pub async fn extract_entities_and_relations(&self, text: &str) -> ExtractionOutcome {
        let prompt = format!("{EXTRACTION_PROMPT}{text}");
        let options = GenerationOptions {
            model: self.extraction_model.clone(),
            ..GenerationOptions::structured(self.config.extraction_max_tokens)
        };

        let reply = match self.llm_guard.run(self.generator.generate(&prompt, &options)).await {
            Ok(reply) => reply,
            Err(e) => {
                return ExtractionOutcome {
                    extraction: Extraction::default(),
                    degradation: Some(Degradation::generation("extract", &e)),
                }
            }
        };

        match parse_extraction(&reply) {
            Some(extraction) => ExtractionOutcome {
                extraction: clean(extraction),
                degradation: None,
            },
            None => {
                tracing::warn!(reply = %truncate_chars(&reply, 120), "unparseable extraction reply");
                ExtractionOutcome {
                    extraction: Extraction::default(),
                    degradation: Some(Degradation::ExtractionParseFailure {
                        reason: format!("not a JSON object: {}", truncate_chars(reply.trim(), 80)),
                    }),
                }
            }
        }
    }

    /// Extract from `text` and merge the result into the graph.
    ///
    /// Only a failed persist is an error; extraction problems are reported
    /// on the returned update.
    pub async fn add_knowledge(&self, text: &str, source: &str) -> DomainResult<GraphUpdate> {
        let outcome = self.extract_entities_and_relations(text).await;
        let mut update = GraphUpdate {
            degradations: outcome.degradation.into_iter().collect(),
            ..GraphUpdate::default()
        };

        // Held across mutation and write so snapshots reach disk in order.
        let persist_guard = self.persist_lock.lock().await;
        let snapshot = {
            let mut inner = self.inner.write().await;
            for entity in &outcome.extraction.entities {
                let (created, updated) = inner.upsert_node(&entity.name, &entity.entity_type, source);
                update.nodes_added += usize::from(created);
                update.nodes_updated += usize::from(updated);
            }
            for relation in &outcome.extraction.relations {
                let (created, added) =
                    inner.insert_edge(&relation.source, &relation.target, &relation.relation, source);
                update.nodes_added += created;
                update.edges_added += usize::from(added);
            }
            update.changed().then(|| inner.snapshot())
        };

        if let Some(snapshot) = snapshot {
            self.write_snapshot(&snapshot).await?;
        }
        drop(persist_guard);

        tracing::info!(
            source,
            nodes_added = update.nodes_added,
            nodes_updated = update.nodes_updated,
            edges_added = update.edges_added,
            degraded = !update.degradations.is_empty(),
            "graph updated"
        );
        Ok(update)
    }

    /// Entities related to `query`, nearest first, at most `top_k`.
    pub async fn query(&self, query: &str, max_hops: usize, top_k: usize) -> Vec<EntityHit> {
        if query.trim().is_empty() || top_k == 0 {
            return Vec::new();
        }
        let inner = self.inner.read().await;
        let seeds = inner.seeds(query);

        let mut hits: Vec<EntityHit> = inner
            .traverse(&seeds, max_hops)
            .into_iter()
            .map(|(idx, hop)| {
                let node = &inner.graph[idx];
                EntityHit {
                    name: node.name.clone(),
                    entity_type: node.entity_type.clone(),
                    source: node.source.clone(),
                    hop,
                }
            })
            .collect();
        hits.sort_by(|a, b| a.hop.cmp(&b.hop).then_with(|| a.name.cmp(&b.name)));
        hits.truncate(top_k);
        hits
    }

    /// Render query results and their relations as a prompt block of
    /// roughly `max_chars`. The line that crosses the budget is kept.
    pub async fn get_context(&self, query: &str, max_chars: usize) -> String {
        let hits = self
            .query(query, self.config.default_max_hops, self.config.default_top_k)
            .await;
        if hits.is_empty() {
            return String::new();
        }

        let inner = self.inner.read().await;
        let included: HashSet<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        let mut lines = Vec::new();
        let mut used = 0;

        for hit in &hits {
            if used > max_chars {
                break;
            }
            let mut line = format!("- {} ({})", hit.name, hit.entity_type);
            if let Some(&idx) = inner.by_name.get(&hit.name) {
                let relations: Vec<String> = inner
                    .graph
                    .edges_directed(idx, Direction::Outgoing)
                    .filter(|e| included.contains(inner.graph[e.target()].name.as_str()))
                    .map(|e| format!("{} {}", e.weight().relation, inner.graph[e.target()].name))
                    .collect();
                if !relations.is_empty() {
                    line.push_str(": ");
                    line.push_str(&relations.join("; "));
                }
            }
            used += line.chars().count() + 1;
            lines.push(line);
        }

        lines.join("\n")
    }

    pub async fn stats(&self) -> GraphStats {
        let inner = self.inner.read().await;
        GraphStats {
            nodes: inner.graph.node_count(),
            edges: inner.graph.edge_count(),
        }
    }

    /// Write the current graph to disk.
    pub async fn flush(&self) -> DomainResult<()> {
        let _persist = self.persist_lock.lock().await;
        let snapshot = self.inner.read().await.snapshot();
        self.write_snapshot(&snapshot).await
    }

    /// Callers must hold `persist_lock`.
    async fn write_snapshot(&self, snapshot: &GraphSnapshot) -> DomainResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            path = %path.display(),
            "graph persisted"
        );
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> DomainResult<GraphSnapshot> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::SerializationError(format!("graph file {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GraphSnapshot::default()),
        Err(e) => Err(e.into()),
    }
}

/// Trim names and drop entities or relations with empty endpoints.
fn clean(mut extraction: Extraction) -> Extraction {
    extraction.entities.retain_mut(|e| {
        e.name = e.name.trim().to_string();
        e.entity_type = e.entity_type.trim().to_string();
        if e.entity_type.is_empty() {
            e.entity_type = UNKNOWN_TYPE.to_string();
        }
        !e.name.is_empty()
    });
    extraction.relations.retain_mut(|r| {
        r.source = r.source.trim().to_string();
        r.target = r.target.trim().to_string();
        r.relation = r.relation.trim().to_string();
        if r.relation.is_empty() {
            r.relation = "related_to".to_string();
        }
        !r.source.is_empty() && !r.target.is_empty()
    });
    extraction
}
