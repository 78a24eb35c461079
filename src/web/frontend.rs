//! Embedded HTML/CSS/JS frontend for the custpulse dashboard.
//!
//! The whole page is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies. Charts are
//! plain DOM bars and an inline SVG scatter plot.

/// The complete single-page app.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>custpulse</title>
<style>
:root {
  --bg: #002424;
  --surface: #003838;
  --border: #005050;
  --text: #e6f2f2;
  --text-muted: #8fb3b3;
  --accent: #ffdf00;
  --teal: #00a0a0;
  --teal-dark: #007373;
  --amber: #ffb300;
  --red: #ff6b6b;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }
header h1 .logo { color: var(--accent); font-family: var(--mono); }
header .subtitle { color: var(--text-muted); font-size: 13px; }

.badge {
  display: inline-flex;
  padding: 4px 10px;
  border-radius: 12px;
  font-size: 12px;
  border: 1px solid var(--border);
}
.badge.ok { border-color: var(--teal); color: var(--teal); }
.badge.err { border-color: var(--red); color: var(--red); }

nav {
  display: flex;
  gap: 4px;
  margin-bottom: 24px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav button {
  flex: 1;
  padding: 8px 16px;
  border: none;
  border-radius: 6px;
  background: transparent;
  color: var(--text-muted);
  font-size: 13px;
  cursor: pointer;
}
nav button.active { background: var(--accent); color: #002424; font-weight: 600; }
nav button:disabled { opacity: 0.4; cursor: not-allowed; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; color: var(--accent); }

.banner {
  border: 1px solid var(--red);
  color: var(--red);
  background: rgba(255,107,107,0.08);
  border-radius: var(--radius);
  padding: 12px 16px;
  margin-bottom: 16px;
}
.inline-error { color: var(--red); font-size: 13px; margin-top: 8px; }
.hidden { display: none; }

.form-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(220px, 1fr));
  gap: 12px;
}
.form-grid label { font-size: 12px; color: var(--text-muted); display: block; }
.form-grid input {
  width: 100%;
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: 6px;
  color: var(--text);
  padding: 6px 10px;
  font-family: var(--mono);
}

.btn {
  display: inline-flex;
  padding: 8px 16px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--surface);
  color: var(--text);
  font-size: 13px;
  cursor: pointer;
}
.btn.primary { background: var(--accent); color: #002424; border-color: var(--accent); font-weight: 600; }
.btn.danger { border-color: var(--red); color: var(--red); }
.btn:disabled { opacity: 0.4; cursor: not-allowed; }
.actions { display: flex; gap: 12px; margin: 16px 0; }

.stats-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
  margin-bottom: 16px;
}
.stat-card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  text-align: center;
}
.stat-card .value { font-size: 30px; font-weight: 700; font-family: var(--mono); color: var(--accent); }
.stat-card .label { font-size: 12px; color: var(--text-muted); text-transform: uppercase; }

.grid-2 { display: grid; grid-template-columns: repeat(auto-fit, minmax(420px, 1fr)); gap: 16px; }

.hbar { display: flex; align-items: center; gap: 8px; margin-bottom: 6px; font-size: 12px; }
.hbar .name { flex: 0 0 160px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
.hbar .fill { height: 14px; border-radius: 3px; background: var(--teal); }
.hbar .count { color: var(--text-muted); font-family: var(--mono); }

table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-weight: 500; font-size: 12px; text-transform: uppercase; }
td.num { text-align: right; font-family: var(--mono); }
td.high { color: var(--red); font-weight: 600; }

.customer-list { max-height: 240px; overflow-y: auto; font-size: 13px; }
.customer-list li { list-style: none; padding: 6px 0; border-bottom: 1px solid var(--border); }
.legend span { margin-right: 12px; font-size: 12px; }
.legend i { display: inline-block; width: 10px; height: 10px; border-radius: 50%; margin-right: 4px; }
.loader { color: var(--accent); font-family: var(--mono); }
</style>
</head>
<body>
<div class="app">
  <header>
    <div>
      <h1><span class="logo">custpulse</span> Customer Behavior Analytics</h1>
      <div class="subtitle">Predictive purchase scores, churn risk and segments</div>
    </div>
    <div id="health"></div>
  </header>

  <nav>
    <button id="nav-input" class="active" onclick="setView('input')">Input &amp; Analysis</button>
    <button id="nav-dashboard" onclick="setView('dashboard')">Dashboard</button>
  </nav>

  <div id="banner" class="banner hidden"></div>

  <section id="view-input">
    <div class="card">
      <h2>Upload CSV</h2>
      <input type="file" id="csv-file" accept=".csv,text/csv">
      <div class="subtitle">Headers: Customer ID, Age, Gender, Last Purchase Date, Total Purchase Amount, Visit Frequency, Last Active Date, Pages Visited, Email Opens, Product Preferences</div>
      <div id="upload-error" class="inline-error hidden"></div>
    </div>

    <div class="card">
      <h2>Add Customer Manually</h2>
      <form id="manual-form" class="form-grid" onsubmit="return submitManual(event)"></form>
      <div class="actions"><button class="btn" onclick="return submitManual(event)">Add Customer</button></div>
      <div id="form-error" class="inline-error hidden"></div>
    </div>

    <div id="customers" class="card hidden">
      <h2 id="customers-title"></h2>
      <ul id="customer-list" class="customer-list"></ul>
    </div>

    <div class="actions">
      <button id="analyze" class="btn primary" onclick="analyze()">Analyze Behavior</button>
      <button class="btn danger" onclick="clearAll()">Clear All Data</button>
      <span id="loader" class="loader hidden">Analyzing...</span>
    </div>

    <div id="previous" class="card hidden">
      <h2>Previous Analysis Results</h2>
      <div id="previous-table"></div>
    </div>
  </section>

  <section id="view-dashboard" class="hidden">
    <div id="kpis" class="stats-grid"></div>
    <div class="grid-2">
      <div class="card"><h2>Customer Segments</h2><div id="segments"></div></div>
      <div class="card"><h2>Purchase Score vs. Churn Risk</h2><div id="scatter"></div></div>
      <div class="card"><h2>Top Product Preferences</h2><div id="preferences"></div></div>
      <div class="card"><h2>Behavior Distributions</h2><div id="distributions"></div></div>
    </div>
    <div class="card"><h2>Analysis Results</h2><div id="results-table"></div></div>
  </section>
</div>

<script>
const FIELDS = [
  ['customerId', 'Customer ID *'], ['age', 'Age'], ['gender', 'Gender'],
  ['lastPurchaseDate', 'Last Purchase Date'], ['totalPurchaseAmount', 'Total Purchase Amount'],
  ['visitFrequency', 'Visit Frequency'], ['lastActiveDate', 'Last Active Date'],
  ['pagesVisited', 'Pages Visited'], ['emailOpens', 'Email Opens'],
  ['productPreferences', 'Product Preferences'],
];
const SEGMENT_COLORS = {
  'Loyal Buyer': '#00A0A0', 'At-Risk': '#FF6B6B', 'New Shopper': '#007373',
  'Window Shopper': '#FFB300', 'High Value': '#FFE973',
};
const PALETTE = ['#FFDF00', '#007373', '#FFB300', '#00A0A0', '#FFE973', '#005050', '#FFC700', '#26A69A', '#FFCC80', '#4DB6AC'];
let state = null;

async function api(method, path, body, raw) {
  const opts = { method, headers: {} };
  if (body !== undefined) {
    opts.body = raw ? body : JSON.stringify(body);
    opts.headers['Content-Type'] = raw ? 'text/csv' : 'application/json';
  }
  const res = await fetch(path, opts);
  const data = await res.json();
  return { ok: res.ok, data };
}

function esc(s) {
  return String(s ?? '').replace(/[&<>"']/g, c => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
}

function show(id, visible) { document.getElementById(id).classList.toggle('hidden', !visible); }

function render() {
  const view = state.view;
  document.getElementById('nav-input').classList.toggle('active', view === 'input');
  document.getElementById('nav-dashboard').classList.toggle('active', view === 'dashboard');
  document.getElementById('nav-dashboard').disabled = state.results.length === 0 && view !== 'dashboard';
  show('view-input', view === 'input');
  show('view-dashboard', view === 'dashboard');

  const banner = document.getElementById('banner');
  banner.textContent = state.error || '';
  show('banner', !!state.error);

  const up = document.getElementById('upload-error');
  up.textContent = state.uploadError || '';
  show('upload-error', !!state.uploadError);

  const running = state.status === 'running';
  document.getElementById('analyze').disabled = !state.canAnalyze;
  show('loader', running);

  show('customers', state.records.length > 0);
  document.getElementById('customers-title').textContent = `Customers Ready for Analysis (${state.records.length})`;
  document.getElementById('customer-list').innerHTML = state.records.map(r =>
    `<li><b>${esc(r.customerId)}</b> ${r.age !== undefined ? '· Age ' + esc(r.age) : ''} ${r.productPreferences ? '· ' + esc(r.productPreferences) : ''}</li>`
  ).join('');

  show('previous', state.previousResults.length > 0);
  document.getElementById('previous-table').innerHTML = resultsTable(state.previousResults);

  if (view === 'dashboard') loadDashboard();
}

function resultsTable(results) {
  if (!results.length) return '<div class="subtitle">No results yet.</div>';
  const rows = results.map(r =>
    `<tr><td>${esc(r.customerId)}</td><td class="num">${esc(r.purchaseScore)}</td>` +
    `<td class="num ${r.highChurn ? 'high' : ''}">${esc(r.churnRisk)}</td>` +
    `<td>${esc(r.segment)}</td><td>${esc(r.nextBestAction)}</td></tr>`
  ).join('');
  return `<table><thead><tr><th>Customer ID</th><th class="num">Purchase Score</th><th class="num">Churn Risk</th><th>Segment</th><th>Next Best Action</th></tr></thead><tbody>${rows}</tbody></table>`;
}

function hbars(items, colorFor) {
  if (!items.length) return '<div class="subtitle">No data.</div>';
  const max = Math.max(...items.map(i => i.count), 1);
  return items.map((i, idx) =>
    `<div class="hbar"><span class="name" title="${esc(i.label)}">${esc(i.label)}</span>` +
    `<span class="fill" style="width:${Math.max(2, i.count / max * 240)}px;background:${colorFor(i, idx)}"></span>` +
    `<span class="count">${i.count}</span></div>`
  ).join('');
}

function scatter(series) {
  if (!series.length) return '<div class="subtitle">No data.</div>';
  const W = 420, H = 260, P = 32;
  const sx = v => P + Math.min(100, Math.max(0, v)) / 100 * (W - 2 * P);
  const sy = v => H - P - Math.min(100, Math.max(0, v)) / 100 * (H - 2 * P);
  let dots = '';
  for (const s of series) {
    const color = SEGMENT_COLORS[s.segment] || '#B0BEC5';
    for (const p of s.points) {
      dots += `<circle cx="${sx(p.x)}" cy="${sy(p.y)}" r="5" fill="${color}"><title>${esc(p.customerId)}: ${p.x}% / ${p.y}%</title></circle>`;
    }
  }
  const axes = `<line x1="${P}" y1="${H - P}" x2="${W - P}" y2="${H - P}" stroke="#8fb3b3"/>` +
    `<line x1="${P}" y1="${P}" x2="${P}" y2="${H - P}" stroke="#8fb3b3"/>` +
    `<text x="${W / 2}" y="${H - 6}" fill="#8fb3b3" font-size="11" text-anchor="middle">Purchase Score (%)</text>` +
    `<text x="10" y="${H / 2}" fill="#8fb3b3" font-size="11" transform="rotate(-90 10 ${H / 2})" text-anchor="middle">Churn Risk (%)</text>`;
  const legend = series.map(s =>
    `<span><i style="background:${SEGMENT_COLORS[s.segment] || '#B0BEC5'}"></i>${esc(s.segment)}</span>`
  ).join('');
  return `<svg width="${W}" height="${H}">${axes}${dots}</svg><div class="legend">${legend}</div>`;
}

async function loadDashboard() {
  const { ok, data } = await api('GET', '/api/dashboard');
  if (!ok) return;
  const k = data.kpiDisplay;
  document.getElementById('kpis').innerHTML = [
    [k.analyzedCount, 'Customers Analyzed'],
    [k.avgPurchaseValue, 'Avg. Purchase Value'],
    [k.avgVisitFrequency, 'Avg. Visit Frequency'],
    [k.highChurnShare, 'High Churn Risk'],
  ].map(([v, l]) => `<div class="stat-card"><div class="value">${esc(v)}</div><div class="label">${l}</div></div>`).join('');
  document.getElementById('segments').innerHTML = hbars(data.segments, (_, i) => PALETTE[i % PALETTE.length]);
  document.getElementById('scatter').innerHTML = scatter(data.scatter);
  document.getElementById('preferences').innerHTML = hbars(data.topPreferences, (_, i) => PALETTE[i % PALETTE.length]);
  document.getElementById('distributions').innerHTML = data.distributions.map(d =>
    `<h3 class="subtitle">${esc(d.title)}</h3>` + hbars(d.bins, () => 'var(--teal)')
  ).join('');
  document.getElementById('results-table').innerHTML = resultsTable(data.results);
}

async function refresh() {
  const { data } = await api('GET', '/api/state');
  state = data;
  render();
}

async function setView(view) {
  const { ok, data } = await api('PUT', '/api/view', { view });
  if (ok) { state = data; render(); }
}

async function analyze() {
  state.status = 'running';
  state.canAnalyze = false;
  state.previousResults = [];
  render();
  const { data } = await api('POST', '/api/analyze');
  state = data.state;
  render();
}

async function clearAll() {
  const { data } = await api('POST', '/api/clear');
  state = data;
  render();
}

async function submitManual(event) {
  if (event) event.preventDefault();
  const draft = {};
  for (const [key] of FIELDS) draft[key] = document.getElementById('f-' + key).value;
  const { ok, data } = await api('POST', '/api/customers', draft);
  const err = document.getElementById('form-error');
  if (ok) {
    for (const [key] of FIELDS) document.getElementById('f-' + key).value = '';
    err.textContent = '';
    show('form-error', false);
    state = data.state;
    render();
  } else {
    err.textContent = data.error;
    show('form-error', true);
  }
  return false;
}

document.getElementById('csv-file').addEventListener('change', e => {
  const file = e.target.files[0];
  if (!file) return;
  const reader = new FileReader();
  reader.onload = async () => {
    const { data } = await api('POST', '/api/customers/csv', reader.result, true);
    state = data.state;
    render();
  };
  reader.onerror = () => {
    const up = document.getElementById('upload-error');
    up.textContent = 'Failed to read the file.';
    show('upload-error', true);
  };
  reader.readAsText(file);
  e.target.value = '';
});

async function loadHealth() {
  const { data } = await api('GET', '/api/health');
  const cls = data.apiKeyConfigured ? 'ok' : 'err';
  const label = data.apiKeyConfigured ? esc(data.model) : 'API key missing';
  document.getElementById('health').innerHTML = `<span class="badge ${cls}">${label}</span>`;
}

document.getElementById('manual-form').innerHTML = FIELDS.map(([key, label]) =>
  `<div><label for="f-${key}">${label}</label><input id="f-${key}" type="text"></div>`
).join('');

refresh();
loadHealth();
</script>
</body>
</html>
"##;
